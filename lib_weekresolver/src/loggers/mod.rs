/// Console and rolling-file `tracing` subscriber setup.
pub mod tracing_setup;
