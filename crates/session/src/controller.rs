use crate::config::SessionConfig;
use crate::decode::{decode_parse, decode_query};
use crate::error::{Result, SessionError};
use crate::pipeline::Pipeline;
use crate::service::{ParserService, QueryService, SessionServices};
use crate::state::{
    MappingStatus, PipelineKind, PipelineOutcome, QueryState, SessionEvent, SessionSnapshot,
    TreeState,
};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use uast_dev_mappings::{
    CustomEntry, CustomMappingId, CustomMappingStore, Language, Mapping, MappingField,
    MappingRegistry, MappingResolver, RegistryError,
};
use uast_dev_protocol::{ParseRequest, ParseResponse, QueryRequest, QueryResponse, TransportError};

/// Handle to a running session.
///
/// All state lives in a single task; handles only send commands and observe snapshots, so every
/// transition is applied atomically between suspension points. The task stops when the last
/// handle is dropped or [`SessionController::shutdown`] is called.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionControllerInner>,
}

struct SessionControllerInner {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    state_rx: watch::Receiver<SessionSnapshot>,
    event_tx: broadcast::Sender<SessionEvent>,
}

enum SessionCommand {
    SetLanguage(Language),
    SetCode(String),
    SetQuery(String),
    SelectEmbedded,
    SelectCustom(CustomMappingId),
    ClearSelection,
    EditSelected(MappingField),
    ResetEmbedded,
    CreateCustom {
        select: bool,
        reply: oneshot::Sender<CustomEntry>,
    },
    UpdateCustom {
        id: CustomMappingId,
        field: MappingField,
    },
    RemoveCustom(CustomMappingId),
    RetryParse,
    RetryQuery,
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

enum Completion {
    Catalog {
        requested: Language,
        result: std::result::Result<Option<Language>, RegistryError>,
    },
    Mapping {
        epoch: u64,
        language: Language,
        result: std::result::Result<Option<Mapping>, RegistryError>,
    },
    Parse {
        generation: u64,
        result: std::result::Result<ParseResponse, TransportError>,
    },
    Query {
        generation: u64,
        result: std::result::Result<QueryResponse, TransportError>,
    },
}

impl SessionController {
    /// Spawns the session task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        services: SessionServices,
        custom_mappings: CustomMappingStore,
        config: SessionConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(256);

        let actor = SessionActor::new(services, custom_mappings, config, completion_tx, event_tx.clone());
        let (state_tx, state_rx) = watch::channel(actor.snapshot());
        tokio::spawn(actor.run(command_rx, completion_rx, state_tx));

        Self {
            inner: Arc::new(SessionControllerInner {
                command_tx,
                state_rx,
                event_tx,
            }),
        }
    }

    pub fn set_language(&self, language: impl Into<Language>) -> Result<()> {
        self.send(SessionCommand::SetLanguage(language.into()))
    }

    pub fn set_code(&self, code: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SetCode(code.into()))
    }

    pub fn set_query(&self, query: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SetQuery(query.into()))
    }

    pub fn select_embedded(&self) -> Result<()> {
        self.send(SessionCommand::SelectEmbedded)
    }

    pub fn select_custom(&self, id: CustomMappingId) -> Result<()> {
        self.send(SessionCommand::SelectCustom(id))
    }

    pub fn clear_selection(&self) -> Result<()> {
        self.send(SessionCommand::ClearSelection)
    }

    pub fn edit_selected(&self, field: MappingField) -> Result<()> {
        self.send(SessionCommand::EditSelected(field))
    }

    pub fn reset_embedded(&self) -> Result<()> {
        self.send(SessionCommand::ResetEmbedded)
    }

    /// Creates a custom mapping; with `select` it also becomes the active mapping.
    pub async fn create_custom(&self, select: bool) -> Result<CustomEntry> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::CreateCustom { select, reply })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn update_custom(&self, id: CustomMappingId, field: MappingField) -> Result<()> {
        self.send(SessionCommand::UpdateCustom { id, field })
    }

    pub fn remove_custom(&self, id: CustomMappingId) -> Result<()> {
        self.send(SessionCommand::RemoveCustom(id))
    }

    pub fn retry_parse(&self) -> Result<()> {
        self.send(SessionCommand::RetryParse)
    }

    pub fn retry_query(&self) -> Result<()> {
        self.send(SessionCommand::RetryQuery)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state_rx.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state_rx.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Resolves once every command sent before this call has been applied and published.
    pub async fn sync(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Barrier(reply))?;
        rx.await.map_err(|_| SessionError::Closed)?;
        Ok(self.snapshot())
    }

    /// Waits until the mapping for the current language is no longer loading.
    pub async fn mapping_resolved(&self) -> Result<SessionSnapshot> {
        self.sync().await?;
        let mut rx = self.watch();
        let snapshot = rx
            .wait_for(|s| s.mapping_status != MappingStatus::Loading)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Waits until no timer is pending and nothing is in flight.
    pub async fn settled(&self) -> Result<SessionSnapshot> {
        self.sync().await?;
        let mut rx = self.watch();
        let snapshot = rx
            .wait_for(SessionSnapshot::is_settled)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .map_err(|_| SessionError::Closed)
    }
}

struct SessionActor {
    registry: Arc<MappingRegistry>,
    parser: Arc<dyn ParserService>,
    querier: Arc<dyn QueryService>,
    customs: CustomMappingStore,
    resolver: MappingResolver,
    language: Language,
    code: String,
    query: String,
    tree: TreeState,
    query_result: QueryState,
    mapping_status: MappingStatus,
    parse: Pipeline,
    query_pipeline: Pipeline,
    /// Bumped by every selection action so a late baseline load cannot override it.
    mapping_epoch: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionActor {
    fn new(
        services: SessionServices,
        customs: CustomMappingStore,
        config: SessionConfig,
        completion_tx: mpsc::UnboundedSender<Completion>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            registry: services.registry,
            parser: services.parser,
            querier: services.querier,
            customs,
            resolver: MappingResolver::new(),
            language: config.initial_language,
            code: String::new(),
            query: String::new(),
            tree: TreeState::NoData,
            query_result: QueryState::NoQuery,
            mapping_status: MappingStatus::Loading,
            parse: Pipeline::new(PipelineKind::Parse, config.parse_debounce),
            query_pipeline: Pipeline::new(PipelineKind::Query, config.query_debounce),
            mapping_epoch: 0,
            completion_tx,
            event_tx,
        }
    }

    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        mut completion_rx: mpsc::UnboundedReceiver<Completion>,
        state_tx: watch::Sender<SessionSnapshot>,
    ) {
        self.spawn_catalog_load();
        self.resolve_language();
        self.publish(&state_tx);

        loop {
            let parse_deadline = self.parse.next_deadline();
            let query_deadline = self.query_pipeline.next_deadline();

            tokio::select! {
                biased;

                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(SessionCommand::Barrier(reply)) => {
                            self.publish(&state_tx);
                            let _ = reply.send(());
                        }
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(done) = completion_rx.recv() => self.handle_completion(done),
                () = sleep_until(parse_deadline), if parse_deadline.is_some() => {
                    if self.parse.take_due() {
                        self.fire_parse();
                    }
                }
                () = sleep_until(query_deadline), if query_deadline.is_some() => {
                    if self.query_pipeline.take_due() {
                        self.fire_query();
                    }
                }
            }

            self.publish(&state_tx);
        }
        debug!("Session task stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetLanguage(language) => self.set_language(language),
            SessionCommand::SetCode(code) => {
                if code != self.code {
                    self.code = code;
                    self.parse.schedule();
                }
            }
            SessionCommand::SetQuery(query) => {
                if query != self.query {
                    self.query = query;
                    self.schedule_query();
                }
            }
            SessionCommand::SelectEmbedded => {
                self.mapping_epoch += 1;
                self.resolve_language();
            }
            SessionCommand::SelectCustom(id) => {
                self.mapping_epoch += 1;
                self.mapping_status = MappingStatus::Ready;
                match self.customs.get_by_id(id) {
                    Some(entry) => {
                        let changed = self.resolver.select_custom(entry);
                        self.selection_changed(changed);
                    }
                    None => warn!("Cannot select custom mapping {id}: no such entry"),
                }
            }
            SessionCommand::ClearSelection => {
                self.mapping_epoch += 1;
                self.mapping_status = MappingStatus::Ready;
                let changed = self.resolver.clear();
                self.selection_changed(changed);
            }
            SessionCommand::EditSelected(field) => {
                let changed =
                    self.resolver
                        .edit_selected(field, &self.registry, &mut self.customs);
                self.selection_changed(changed);
            }
            SessionCommand::ResetEmbedded => {
                let changed = self.resolver.reset_embedded(&self.registry);
                self.selection_changed(changed);
            }
            SessionCommand::CreateCustom { select, reply } => {
                let entry = self.customs.create();
                info!("Created custom mapping {} ({})", entry.mapping.name, entry.id);
                if select {
                    self.mapping_epoch += 1;
                    self.mapping_status = MappingStatus::Ready;
                    let changed = self.resolver.select_custom(&entry);
                    self.selection_changed(changed);
                }
                let _ = reply.send(entry);
            }
            SessionCommand::UpdateCustom { id, field } => {
                let Some(entry) = self.customs.update_by_id(id, field).cloned() else {
                    warn!("Cannot update custom mapping {id}: no such entry");
                    return;
                };
                let changed = self.resolver.custom_updated(&entry);
                self.selection_changed(changed);
            }
            SessionCommand::RemoveCustom(id) => {
                if self.customs.remove_by_id(id).is_some() {
                    let changed = self.resolver.custom_removed(id);
                    self.selection_changed(changed);
                }
            }
            SessionCommand::RetryParse => self.parse.schedule_now(),
            SessionCommand::RetryQuery => self.schedule_query_now(),
            SessionCommand::Barrier(_) | SessionCommand::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Catalog { requested, result } => match result {
                Ok(Some(preferred)) => {
                    // A language picked while the catalog was loading wins.
                    if requested == self.language && preferred != self.language {
                        info!("Language {requested} not in catalog, using {preferred}");
                        self.set_language(preferred);
                    }
                }
                Ok(None) => warn!("Mapping catalog is empty"),
                Err(err) => warn!("No embedded mappings available: {err}"),
            },
            Completion::Mapping {
                epoch,
                language,
                result,
            } => {
                if epoch != self.mapping_epoch || language != self.language {
                    debug!("Ignoring stale mapping load for {language}");
                    return;
                }
                let changed = match result {
                    Ok(Some(_)) => {
                        self.mapping_status = MappingStatus::Ready;
                        self.resolver.resolve_embedded(&language, &self.registry)
                    }
                    Ok(None) => {
                        self.mapping_status = MappingStatus::Missing;
                        self.resolver.clear()
                    }
                    Err(err) => {
                        self.mapping_status = MappingStatus::Unavailable(err.into());
                        self.resolver.clear()
                    }
                };
                self.selection_changed(changed);
            }
            Completion::Parse { generation, result } => self.apply_parse(generation, result),
            Completion::Query { generation, result } => self.apply_query(generation, result),
        }
    }

    fn set_language(&mut self, language: Language) {
        if language == self.language {
            return;
        }
        info!("Language changed to {language}");
        self.language = language.clone();
        self.emit(SessionEvent::LanguageChanged { language });
        self.mapping_epoch += 1;
        self.parse.schedule();
        self.resolve_language();
    }

    /// Overlay or cached baseline right away; otherwise clears the selection until the baseline
    /// load for the current epoch completes.
    fn resolve_language(&mut self) {
        let language = self.language.clone();
        if self.registry.has_overlay(&language) || self.registry.cached_baseline(&language).is_some()
        {
            self.mapping_status = MappingStatus::Ready;
            let changed = self.resolver.resolve_embedded(&language, &self.registry);
            self.selection_changed(changed);
            return;
        }

        self.mapping_status = MappingStatus::Loading;
        let changed = self.resolver.clear();
        self.selection_changed(changed);

        let registry = self.registry.clone();
        let tx = self.completion_tx.clone();
        let epoch = self.mapping_epoch;
        tokio::spawn(async move {
            let result = registry.load_baseline(&language).await;
            let _ = tx.send(Completion::Mapping {
                epoch,
                language,
                result,
            });
        });
    }

    fn spawn_catalog_load(&self) {
        let registry = self.registry.clone();
        let tx = self.completion_tx.clone();
        let requested = self.language.clone();
        tokio::spawn(async move {
            let result = registry
                .list_languages()
                .await
                .map(|catalog| catalog.preferred_language(Some(&requested)));
            let _ = tx.send(Completion::Catalog { requested, result });
        });
    }

    fn selection_changed(&mut self, changed: bool) {
        if !changed {
            return;
        }
        let mapping = self.resolver.selected().map(|m| m.name.clone());
        debug!(
            "Selected mapping: {}",
            mapping.as_deref().unwrap_or("none")
        );
        self.emit(SessionEvent::SelectionChanged { mapping });
        self.parse.schedule();
    }

    fn fire_parse(&mut self) {
        if self.code.trim().is_empty() {
            let generation = self.parse.skip();
            self.emit_outcome(&self.parse, generation, PipelineOutcome::Skipped);
            self.tree = TreeState::NoData;
            self.invalidate_query();
            return;
        }

        let request = ParseRequest {
            code: self.code.clone(),
            language: self.language.to_string(),
            mapping_overrides: self
                .resolver
                .selection()
                .map(|selection| selection.overrides())
                .unwrap_or_default(),
        };
        let generation = self.parse.begin();
        debug!(
            "Issuing parse generation {generation} ({} bytes, {} overrides)",
            request.code.len(),
            request.mapping_overrides.len()
        );
        self.emit_outcome(&self.parse, generation, PipelineOutcome::Issued);

        let parser = self.parser.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = parser.parse(request).await;
            let _ = tx.send(Completion::Parse { generation, result });
        });
    }

    fn apply_parse(
        &mut self,
        generation: u64,
        result: std::result::Result<ParseResponse, TransportError>,
    ) {
        if !self.parse.accepts(generation) {
            debug!(
                "Discarding superseded parse generation {generation} (latest {})",
                self.parse.generation()
            );
            self.emit_outcome(&self.parse, generation, PipelineOutcome::Superseded);
            return;
        }

        self.tree = decode_parse(result);
        match &self.tree {
            TreeState::Tree(_) => {
                debug!("Applied parse generation {generation}");
                self.parse.finish(generation, PipelineOutcome::Applied);
                self.emit_outcome(&self.parse, generation, PipelineOutcome::Applied);
                self.schedule_query_now();
            }
            TreeState::Error(err) => {
                warn!("Parse generation {generation} failed: {err}");
                self.parse.finish(generation, PipelineOutcome::Failed);
                self.emit_outcome(&self.parse, generation, PipelineOutcome::Failed);
                self.invalidate_query();
            }
            TreeState::NoData => {}
        }
    }

    /// The tree is gone: a non-blank query can only report that there is nothing to query.
    fn invalidate_query(&mut self) {
        if self.query.trim().is_empty() {
            return;
        }
        let generation = self.query_pipeline.skip();
        self.emit_outcome(&self.query_pipeline, generation, PipelineOutcome::Skipped);
        self.query_result = QueryState::NoTreeData;
    }

    /// Guards that can answer without the service, or `None` when a request is needed.
    fn query_guard(&self) -> Option<QueryState> {
        if self.tree.tree().is_none() {
            return Some(QueryState::NoTreeData);
        }
        if self.query.trim().is_empty() {
            return Some(QueryState::NoQuery);
        }
        None
    }

    fn schedule_query(&mut self) {
        match self.query_guard() {
            Some(state) => self.skip_query(state),
            None => self.query_pipeline.schedule(),
        }
    }

    fn schedule_query_now(&mut self) {
        match self.query_guard() {
            Some(state) => self.skip_query(state),
            None => self.query_pipeline.schedule_now(),
        }
    }

    fn skip_query(&mut self, state: QueryState) {
        let generation = self.query_pipeline.skip();
        self.emit_outcome(&self.query_pipeline, generation, PipelineOutcome::Skipped);
        self.query_result = state;
    }

    fn fire_query(&mut self) {
        if let Some(state) = self.query_guard() {
            self.skip_query(state);
            return;
        }
        let Some(tree) = self.tree.tree() else {
            return;
        };
        let request = QueryRequest {
            tree: tree.json.clone(),
            query: self.query.clone(),
        };
        let generation = self.query_pipeline.begin();
        debug!("Issuing query generation {generation}: {}", request.query);
        self.emit_outcome(&self.query_pipeline, generation, PipelineOutcome::Issued);

        let querier = self.querier.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = querier.query(request).await;
            let _ = tx.send(Completion::Query { generation, result });
        });
    }

    fn apply_query(
        &mut self,
        generation: u64,
        result: std::result::Result<QueryResponse, TransportError>,
    ) {
        if !self.query_pipeline.accepts(generation) {
            debug!(
                "Discarding superseded query generation {generation} (latest {})",
                self.query_pipeline.generation()
            );
            self.emit_outcome(&self.query_pipeline, generation, PipelineOutcome::Superseded);
            return;
        }

        self.query_result = decode_query(result);
        let outcome = match &self.query_result {
            QueryState::Error(err) => {
                warn!("Query generation {generation} failed: {err}");
                PipelineOutcome::Failed
            }
            _ => {
                debug!("Applied query generation {generation}");
                PipelineOutcome::Applied
            }
        };
        self.query_pipeline.finish(generation, outcome);
        self.emit_outcome(&self.query_pipeline, generation, outcome);
    }

    fn emit_outcome(&self, pipeline: &Pipeline, generation: u64, outcome: PipelineOutcome) {
        self.emit(SessionEvent::Pipeline {
            kind: pipeline.kind(),
            generation,
            outcome,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            language: self.language.clone(),
            code: self.code.clone(),
            query: self.query.clone(),
            selection: self.resolver.selection().cloned(),
            mapping_status: self.mapping_status.clone(),
            custom_mappings: self.customs.entries().to_vec(),
            tree: self.tree.clone(),
            query_result: self.query_result.clone(),
            parse_status: self.parse.status(),
            query_status: self.query_pipeline.status(),
        }
    }

    fn publish(&self, state_tx: &watch::Sender<SessionSnapshot>) {
        let next = self.snapshot();
        state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
