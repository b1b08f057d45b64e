//! Ownership traits shared by everything that hands memory and file descriptors
//! to the kernel for the duration of an asynchronous operation.

pub mod buf;

pub mod io_fd;
