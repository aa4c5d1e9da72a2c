
use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const CHANNEL_DEPTH:usize = 10;

pub enum BlockResult<U> {
	NotReady,
	Ready(U),
}

// A type that implements BlockFunctionality consumes instances of T and produces either
// Ready(U) if an output is ready or NotReady if it isn't.  Control values of type C reconfigure
// the block and produce a response of type D, or an error if the control value was rejected
pub trait BlockFunctionality<C: Clone, D, T: Clone, U> {

	// Inputs and control values are borrowed; a block that needs to keep one can clone it
	fn control(&mut self, control:&C) -> Result<D, &'static str>;
	fn apply(&mut self, input:&T) -> BlockResult<U>;

}

// The task owns the block while it runs and hands it back through shutdown, so whatever the
// control values did to it can be read afterwards
pub struct Block<B, C: 'static + Send, T: 'static + Send, U: 'static + Send> {
	pub tx_control: mpsc::Sender<C>,
	pub tx_input:   mpsc::Sender<T>,
	pub rx_output:  mpsc::Receiver<U>,
	handle:         JoinHandle<Result<B, &'static str>>,
}

impl<B, C, T, U> Block<B, C, T, U>
	where B: 'static + BlockFunctionality<C, (), T, U> + Send,
	      C: 'static + Send + Sync + Clone,
	      T: 'static + Send + Sync + Clone,
	      U: 'static + Send + Sync {

	pub fn from(b:B) -> Self {

		let (   tx_control, mut rx_control) = mpsc::channel::<C>(CHANNEL_DEPTH);
		let (     tx_input,   mut rx_input) = mpsc::channel::<T>(CHANNEL_DEPTH);
		let (mut tx_output,      rx_output) = mpsc::channel::<U>(CHANNEL_DEPTH);

		let handle:JoinHandle<Result<B, &'static str>> = tokio::spawn(async move {

			let mut owned_b = b;

			while let Some(t) = rx_input.recv().await {

				// Every pending control value is applied before the next input, so an input is
				// always processed with one configuration from start to finish
				apply_pending_control::<B, C, T, U>(&mut owned_b, &mut rx_control);

				if let BlockResult::Ready(u) = owned_b.apply(&t) {
					tx_output.send(u).await.map_err(|_| "Unable to send output")?;
				}

			}

			// Control values sent after the last input still count
			apply_pending_control::<B, C, T, U>(&mut owned_b, &mut rx_control);

			Ok(owned_b)
		});

		Block{ tx_control, tx_input, rx_output, handle }
	}

	pub async fn shutdown(self) -> Result<B, &'static str> {

		let Block{ tx_control, tx_input, rx_output:_, handle } = self;

		drop(tx_control);
		drop(tx_input);

		handle.await.map_err(|_| "Block task did not run to completion")?
	}

}

fn apply_pending_control<B, C, T, U>(b:&mut B, rx_control:&mut mpsc::Receiver<C>)
	where B: BlockFunctionality<C, (), T, U>, C: Clone, T: Clone {

	while let Ok(c) = rx_control.try_recv() {
		if let Err(e) = b.control(&c) {
			warn!("Rejected control value: {}", e);
		}
	}
}
