//! Input and output for a cleaning run: walking the must-gather tree,
//! deciding which files to leave out, and writing the cleaned copy.

pub mod input;
pub mod kube;
pub mod omit;
pub mod writer;

pub use input::{Entry, InputFile, LineReader, walk};
pub use kube::KubeResource;
pub use omit::{KubernetesOmitter, Omitter, PathOmitter};
pub use writer::{FsWriter, LineSink, OutputSink};
