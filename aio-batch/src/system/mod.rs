pub(crate) mod completion;
pub(crate) mod kernel;
pub mod kernel_support;
pub(crate) mod lifecycle;
pub(crate) mod slots;
pub(crate) mod submission;
#[cfg(test)]
mod test_util;
