
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use clap::{Arg, App};
use colored::*;
use num_complex::Complex;
use rake_radio::block::Block;
use rake_radio::gps::{self, GpsMessage, GpsSourceConfig};
use rake_radio::io::{self, BufferedSource};
use rake_radio::rake::{OperatingParams, RakeControl, RakeReceiver};
use serde::{Serialize, Deserialize};

#[derive(Debug, Serialize, Deserialize)]
struct RakeSpec {
	num_fingers: usize,
	delays: Vec<usize>,
	gains: Vec<f64>,
	pattern_length: usize,
	pattern: Option<Vec<Complex<f64>>>,
	adaptive_mode: Option<bool>,
	gps_speed_kmh: Option<f64>,
	operating_params: Option<OperatingParams>,
	gps_source: Option<GpsSourceConfig>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
	samples: usize,
	gps_messages: usize,
	gps_speed_kmh: f64,
	adaptive_mode: bool,
	num_fingers: usize,
	delays: Vec<usize>,
	history: usize,
	operating_params: OperatingParams,
	gps_source: GpsSourceConfig,
}

#[tokio::main]
async fn main() -> Result<(), &'static str> {

	env_logger::init();

	let matches = App::new("RAKE Combine")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Combines IQ samples across RAKE fingers, optionally adapting to speed reports from a GPS log")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename, interleaved i16 IQ")
			.required(true).takes_value(true))
		.arg(Arg::with_name("output_filename")
			.short("o").long("output_filename")
			.help("Output filename, interleaved f32 IQ")
			.takes_value(true))
		.arg(Arg::with_name("json_spec")
			.short("j").long("json_spec")
			.help("JSON file with finger and operating parameter configuration")
			.required(true).takes_value(true))
		.arg(Arg::with_name("gps_log")
			.short("g").long("gps_log")
			.help("File with one NMEA 0183 sentence or GPSD report per line, consumed one line per block")
			.takes_value(true))
		.arg(Arg::with_name("block_size")
			.short("b").long("block_size")
			.takes_value(true))
		.get_matches();

	let fname:&str = matches.value_of("filename").ok_or("No input filename provided")?;
	let block_size:usize = matches.value_of("block_size").unwrap_or("4096").parse().map_err(|_| "Unable to parse block size as a usize")?;
	if block_size == 0 {
		return Err("Block size must be positive");
	}

	// Open configuration file
	let spec:RakeSpec = {
		let fname:&str = matches.value_of("json_spec").ok_or("No JSON specification file provided")?;
		let file = File::open(fname).map_err(|_| "Unable to open JSON specification file")?;
		let reader = BufReader::new(file);
		serde_json::from_reader(reader).map_err(|_| "Unable to parse JSON specification")?
	};

	let mut rake = RakeReceiver::new(spec.num_fingers, &spec.delays, &spec.gains, spec.pattern_length)
		.map_err(|_| "Invalid finger configuration")?;
	if let Some(pattern) = &spec.pattern {
		rake.set_pattern(pattern).map_err(|_| "Pattern doesn't match pattern_length")?;
	}
	if let Some(params) = spec.operating_params {
		rake.set_operating_params(params).map_err(|_| "Invalid operating parameters")?;
	}
	if let Some(gps_source) = spec.gps_source {
		rake.set_gps_source_config(gps_source);
	}
	if let Some(speed_kmh) = spec.gps_speed_kmh {
		rake.set_gps_speed(speed_kmh);
	}
	rake.set_adaptive_mode(spec.adaptive_mode.unwrap_or(false));
	if rake.start_gps() {
		eprintln!("{}", format!("GPS source {} configured but not opened; reading speeds from the GPS log only", rake.gps_source()).yellow());
	}

	let mut gps_lines = match matches.value_of("gps_log") {
		Some(gps_fname) => {
			let file = File::open(gps_fname).map_err(|_| "Unable to open GPS log")?;
			let lines:Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>().map_err(|_| "Unable to read GPS log")?;
			lines.into_iter()
		},
		None => vec![].into_iter(),
	};

	let mut f_out = match matches.value_of("output_filename") {
		Some(out_fname) => Some(BufWriter::new(File::create(out_fname).map_err(|_| "Unable to create output file")?)),
		None => None,
	};

	let mut blk = Block::from(rake);

	let mut src = BufferedSource::new(BufReader::new(File::open(fname).map_err(|_| "Unable to open input file")?));
	let mut total_samples:usize = 0;
	let mut gps_messages:usize = 0;
	let mut block:Vec<Complex<f64>> = Vec::with_capacity(block_size);

	let mut samples = src.by_ref().map(|s| s.val).peekable();
	while samples.peek().is_some() {
		block.clear();
		block.extend(samples.by_ref().take(block_size));

		if let Some(line) = gps_lines.next() {
			if let Some(speed_kmh) = gps::parse_gps_speed(line.trim_end()) {
				gps_messages += 1;
				eprintln!("{:8} [samples] {}", total_samples, format!("{:7.2} [km/h]", speed_kmh).green());
			}
			blk.tx_control.send(RakeControl::Gps(GpsMessage::Text(line))).await.map_err(|_| "Unable to send GPS message")?;
		}

		blk.tx_input.send(block.clone()).await.map_err(|_| "Unable to send samples")?;
		let combined:Vec<Complex<f64>> = blk.rx_output.recv().await.ok_or("Block stopped producing output")?;

		if let Some(f) = f_out.as_mut() {
			io::write_samples(f, &combined)?;
		}
		total_samples += combined.len();
	}

	if let Some(e) = src.error() {
		eprintln!("{}", format!("Input ended after {} samples", total_samples).red());
		return Err(e);
	}

	let rake = blk.shutdown().await?;
	if let Some(f) = f_out.as_mut() {
		f.flush().map_err(|_| "Unable to flush output file")?;
	}

	let summary = RunSummary {
		samples: total_samples,
		gps_messages,
		gps_speed_kmh: rake.gps_speed(),
		adaptive_mode: rake.adaptive_mode(),
		num_fingers: rake.num_fingers(),
		delays: rake.delays().to_vec(),
		history: rake.history(),
		operating_params: *rake.operating_params(),
		gps_source: rake.gps_source_config().clone(),
	};

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&summary).map_err(|_| "Unable to serialize summary")?);

	Ok(())

}
