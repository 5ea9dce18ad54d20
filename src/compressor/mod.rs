//! # Compressor Module
//!
//! Engine di compressione, separato in sottomoduli:
//! - `media_compressor`: Orchestratore del run
//! - `classifier`: Smistamento dei file nelle code
//! - `parameters`: Allocazione dei preset ai worker
//! - `task_worker`: Worker di conversione e di copia
//! - `progress_tracker`: Contatori e code diagnostiche condivise
//! - `status_reporter`: Rendering del progresso e completamento del run
//! - `path_resolver`: Calcolo dei path di output

pub mod classifier;
pub mod media_compressor;
pub mod parameters;
pub mod path_resolver;
pub mod progress_tracker;
pub mod status_reporter;
pub mod task_worker;

pub use classifier::{Classifier, Route, WorkQueues};
pub use media_compressor::{MediaCompressor, RunHandle};
pub use parameters::{ParameterAllocator, ParameterSlot};
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use status_reporter::{RunOutcome, RunReport, StatusReporter};
