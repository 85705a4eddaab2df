pub mod artifact;
pub mod batch;
pub mod bundler;
pub mod config;
pub mod converter;
pub mod fileset;
pub mod gateway;
pub mod metrics;
pub mod object_url;
pub mod route;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use artifact::{Artifact, ArtifactKind};
pub use batch::{
    BatchControl, BatchJob, BatchOrchestrator, BatchProgress, BatchState, CancelHandle, Outcome,
};
pub use bundler::{ArtifactBundler, ArtifactSink, DirectorySink, DownloadError, SavedFile};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use converter::{Converter, ConverterError};
pub use fileset::{FileSet, FileSetLimits, IntakeReport, RawFile, UploadedItem};
pub use gateway::{DownloadRef, GatewayError, HttpGateway, RemoteGateway, Warmup, WarmupOutcome};
pub use object_url::{ObjectUrl, ObjectUrlPool};
pub use route::{
    smart_convert_registry, tool_registry, ConversionRoute, RouteError, RouteRegistry, Tool,
    ToolOptions,
};
pub use session::{Session, SessionError};
