//! Organizer services and collaborators

pub mod audit;
pub mod catalog;
pub mod classifier;
pub mod conflict;
pub mod error;
pub mod file_utils;
pub mod filename_parser;
pub mod filesystem;
pub mod matcher;
pub mod metadata;
pub mod naming;
pub mod organization;
pub mod organizer;
pub mod probe;
pub mod scanner;
pub mod text_utils;
pub mod tvmaze;

pub use audit::FileCorrectionAuditor;
pub use catalog::{Catalog, CatalogFile, CatalogFilter, CatalogItem, CatalogKind, FolderCatalog, NameMatch};
pub use error::{OrganizationError, OrganizationOutcome};
pub use filename_parser::{NameParser, ParserVocabulary};
pub use filesystem::{FileSystem, LocalFileSystem};
pub use matcher::{CatalogMatcher, MatchOutcome};
pub use metadata::{NoRemoteLookup, RemoteLookup, RemoteLookups};
pub use organization::OrganizationService;
pub use organizer::{
    EpisodeCorrection, EventSink, InProgressRegistry, MovieCorrection, OrganizationEngine,
    OrganizationEvent, OrganizeRequest, OrganizerContext,
};
pub use probe::{MediaProbe, NoProbe};
pub use scanner::{ScanSummary, WatchLocationScanner};
pub use tvmaze::TvMazeClient;
