use crate::{
    dispatch::{DispatchDescriptor, Kernel},
    error::BackendError,
};

mod cpu;
pub use cpu::*;

/// A device able to run the three pipeline kernels over flat buffers.
///
/// Buffers returned by [`ComputeBackend::allocate_buffer`] start zeroed.
/// Kernels bind their buffers by position: 0 is the frame constants, 1 the
/// lane buffer and 2 the pixel buffer (accumulate only). A dispatch is not
/// guaranteed to have finished, or to be visible to the next dispatch, until
/// [`ComputeBackend::await_completion`] returns.
pub trait ComputeBackend {
    type Pipeline;
    type Buffer;

    fn name(&self) -> &str;

    /// Lanes per group the kernels are compiled for.
    fn preferred_group_width(&self) -> u32;

    /// Largest single buffer in bytes.
    fn max_buffer_size(&self) -> u64;

    fn compile_kernel(&mut self, kernel: Kernel) -> Result<Self::Pipeline, BackendError>;

    fn allocate_buffer(&mut self, label: &str, size: u64) -> Result<Self::Buffer, BackendError>;

    /// Overwrites the start of `buffer` with `data`.
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]) -> Result<(), BackendError>;

    /// Copies the whole buffer back to the host, waiting for pending work.
    fn read_buffer(&mut self, buffer: &Self::Buffer) -> Result<Vec<u8>, BackendError>;

    fn dispatch(
        &mut self,
        pipeline: &Self::Pipeline,
        bindings: &[&Self::Buffer],
        descriptor: &DispatchDescriptor,
    ) -> Result<(), BackendError>;

    /// Blocks until every dispatch issued so far has completed and its writes
    /// are visible.
    fn await_completion(&mut self) -> Result<(), BackendError>;
}
