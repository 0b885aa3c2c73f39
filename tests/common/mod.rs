#![allow(dead_code)]

pub mod mock_data;
pub mod mock_service;

use std::sync::Arc;

use tessera::config::Config;
use tessera::filters::{IssueFilters, ProjectFilterStore};
use tessera::store::{IssueCollection, ProjectIssues};

use mock_data::PROJECT;
use mock_service::ScriptedIssueService;

/// A controller wired to a scripted service, with default filters loaded for
/// the test project.
pub struct Harness {
    pub service: Arc<ScriptedIssueService>,
    pub filters: Arc<ProjectFilterStore>,
    pub collection: Arc<IssueCollection>,
    pub store: ProjectIssues,
}

impl Harness {
    pub fn new(service: ScriptedIssueService) -> Self {
        Self::with_config(service, &Config::default())
    }

    pub fn with_config(service: ScriptedIssueService, config: &Config) -> Self {
        let service = Arc::new(service);
        let filters = Arc::new(ProjectFilterStore::new());
        filters.set(PROJECT, IssueFilters::default());
        let collection = Arc::new(IssueCollection::new());
        let store =
            ProjectIssues::with_config(service.clone(), filters.clone(), collection.clone(), config);
        Harness {
            service,
            filters,
            collection,
            store,
        }
    }

    pub fn ids(&self) -> Option<Vec<String>> {
        self.store.project_issue_ids(PROJECT)
    }
}
