//! Conflict policy
//!
//! Decides what happens once a target path is known: proceed with the
//! move/copy (optionally clearing duplicates first), hold the file for a
//! human, skip it, or reject it. Pure; all filesystem and catalog facts are
//! gathered by the caller.

use std::path::PathBuf;

use crate::db::{OrganizationStatus, OrganizerType};

/// Facts about one candidate move
#[derive(Debug, Clone, Default)]
pub struct ConflictInput {
    pub organizer_type: Option<OrganizerType>,
    pub source_locked: bool,
    pub source_equals_target: bool,
    pub target_exists: bool,
    pub overwrite_enabled: bool,
    pub overwrite_keyword_present: bool,
    pub auto_detect: bool,
    pub match_existing_only: bool,
    /// The series or movie already exists in the catalog
    pub in_catalog: bool,
    /// Other files already representing the same logical item
    pub duplicates: Vec<PathBuf>,
    /// Movie only: the catalog movie already has a file
    pub existing_movie_file: Option<ExistingMovieFile>,
    /// A confirmed request bypasses the new-media/edition/resolution holds
    pub request_to_move: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingMovieFile {
    pub path: PathBuf,
    pub resolution: Option<String>,
    pub edition: Option<String>,
    pub new_resolution: Option<String>,
    pub new_edition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Move/copy; delete `remove` first.
    ///
    /// `superseded` lists duplicates a confirmed move leaves behind; the
    /// caller decides whether those go too.
    Proceed {
        remove: Vec<PathBuf>,
        superseded: Vec<PathBuf>,
    },
    /// Pause awaiting a user decision
    Hold {
        status: OrganizationStatus,
        message: String,
    },
    /// An equivalent file already exists
    Skip {
        message: String,
        duplicates: Vec<PathBuf>,
    },
    /// Not organizable as requested
    Reject {
        status: OrganizationStatus,
        message: String,
    },
}

fn hold(status: OrganizationStatus, message: &str) -> ConflictDecision {
    ConflictDecision::Hold {
        status,
        message: message.to_string(),
    }
}

fn same_label(a: Option<&str>, b: Option<&str>) -> bool {
    let norm = |v: Option<&str>| v.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    norm(a) == norm(b)
}

/// Apply the transition policy in order
pub fn resolve(input: &ConflictInput) -> ConflictDecision {
    if input.source_locked {
        return ConflictDecision::Reject {
            status: OrganizationStatus::InUse,
            message: "Source file is in use by another process".to_string(),
        };
    }

    if input.source_equals_target {
        return ConflictDecision::Reject {
            status: OrganizationStatus::Failure,
            message: "Source and target paths are the same".to_string(),
        };
    }

    let overwrite = input.overwrite_enabled || input.overwrite_keyword_present;

    let mut duplicates = input.duplicates.clone();
    if input.target_exists && !overwrite {
        return ConflictDecision::Skip {
            message: "A file already exists at the target location".to_string(),
            duplicates,
        };
    }

    if let Some(existing) = &input.existing_movie_file {
        if !overwrite && !input.request_to_move {
            if !same_label(existing.edition.as_deref(), existing.new_edition.as_deref()) {
                return hold(
                    OrganizationStatus::NewEdition,
                    "The movie already exists in a different edition",
                );
            }
            if !same_label(
                existing.resolution.as_deref(),
                existing.new_resolution.as_deref(),
            ) {
                return hold(
                    OrganizationStatus::NewResolution,
                    "The movie already exists in a different resolution",
                );
            }
            duplicates.push(existing.path.clone());
            return ConflictDecision::Skip {
                message: "The movie already exists in the same resolution".to_string(),
                duplicates,
            };
        }
        duplicates.push(existing.path.clone());
    }

    if !input.in_catalog && !input.request_to_move {
        if !input.auto_detect {
            return hold(
                OrganizationStatus::NewMedia,
                "Not in the library and auto-detection is disabled",
            );
        }
        if input.match_existing_only {
            return hold(
                OrganizationStatus::NewMedia,
                "Not in the library; only existing items are matched",
            );
        }
    }

    if input.organizer_type == Some(OrganizerType::Episode)
        && !duplicates.is_empty()
        && !overwrite
        && !input.request_to_move
    {
        return ConflictDecision::Skip {
            message: "The episode already exists in the library".to_string(),
            duplicates,
        };
    }

    duplicates.sort();
    duplicates.dedup();
    if overwrite {
        ConflictDecision::Proceed {
            remove: duplicates,
            superseded: Vec::new(),
        }
    } else if input.request_to_move {
        ConflictDecision::Proceed {
            remove: Vec::new(),
            superseded: duplicates,
        }
    } else {
        ConflictDecision::Proceed {
            remove: Vec::new(),
            superseded: Vec::new(),
        }
    }
}
