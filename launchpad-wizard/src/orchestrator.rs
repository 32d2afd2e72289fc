//! The deployment orchestrator.
//!
//! # Flow
//!
//! ```text
//! SelectMethod ─┬─ choose_managed ──► DomainEntry ── submit_domain ──┐
//!               └─ choose_own_hosting ► SelectHosting ─ select_hosting ┤
//!                                                                      ▼
//!                                         Configure ── deploy ──► Monitoring
//! ```
//!
//! # Concurrency
//!
//! State sits behind a `parking_lot::Mutex` that is never held across an
//! `.await`. Transitions take a busy flag; a transition requested while
//! another is in flight returns [`Transition::Ignored`]. Every response is
//! checked against the epoch it was requested under, and `open`, `close`,
//! credential selection and back navigation bump the epoch, so late
//! responses from an abandoned step are dropped. Directory navigation is not
//! a transition; its responses are ordered by [`Navigator`] tickets instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use launchpad_core::{
    normalize_domain, DeploymentId, DeploymentStatus, DirectoryNode, DomainName,
    HostingCredential, HostingId, ProjectId, StatusEvent,
};

use crate::context::WizardContext;
use crate::directory::{BrowseTicket, DirectoryBrowser, Navigator};
use crate::domain::{parse_domain, DomainChecker};
use crate::error::{Notice, WizardError};
use crate::monitor::Subscription;
use crate::resolver::{
    managed_credential, managed_display_credential, ConfigResolver, CredentialDirectory, ManagedHostingResolver,
};
use crate::state::{ResumeHint, Snapshot, Step, StepKind, Target, TargetForm, Transition};

const STATUS_BUFFER: usize = 32;

/// Drives one project through a deployment.
///
/// Cheap to clone; clones share state. When the last clone is dropped an
/// active live subscription is left on the current runtime.
#[derive(Clone)]
pub struct Wizard {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: WizardContext,
    project: ProjectId,
    state: Mutex<WizardState>,
    busy: AtomicBool,
    statuses: broadcast::Sender<DeploymentStatus>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

struct WizardState {
    step: Step,
    epoch: u64,
    notice: Option<Notice>,
    resume: Option<ResumeHint>,
    /// Domain as last typed on the domain entry step.
    typed_domain: String,
    subscription: Option<Subscription>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn reject<T>(st: &mut WizardState, err: WizardError) -> Result<T, WizardError> {
    tracing::debug!(error = %err, step = %st.step.kind(), "wizard operation rejected");
    st.notice = Some(err.notice());
    Err(err)
}

fn wrong_step(expected: StepKind, step: &Step) -> WizardError {
    WizardError::InvalidStep {
        expected,
        actual: step.kind(),
    }
}

impl Inner {
    fn begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state.lock().epoch == epoch
    }

    /// Record `err` if `epoch` is still current; a stale failure is dropped.
    fn fail(&self, epoch: u64, err: WizardError) -> Result<Transition, WizardError> {
        let mut st = self.state.lock();
        if st.epoch != epoch {
            tracing::debug!(error = %err, "dropping failure from a stale step");
            return Ok(Transition::Ignored);
        }
        reject(&mut st, err)
    }

    /// Back to `SelectMethod` under a new epoch. Returns the subscription to
    /// release.
    fn reset(&self) -> (u64, Option<Subscription>) {
        let mut st = self.state.lock();
        st.epoch += 1;
        st.step = Step::SelectMethod;
        st.notice = None;
        st.resume = None;
        st.typed_domain.clear();
        (st.epoch, st.subscription.take())
    }

    fn settle_browse(
        &self,
        epoch: u64,
        ticket: BrowseTicket,
        result: Result<Vec<DirectoryNode>, WizardError>,
    ) -> Result<Transition, WizardError> {
        let mut st = self.state.lock();
        if st.epoch != epoch {
            return Ok(Transition::Ignored);
        }
        let Some(navigator) = configure_navigator(&mut st.step) else {
            return Ok(Transition::Ignored);
        };
        match result {
            Ok(listing) => {
                let path = ticket.path.clone();
                if navigator.apply(ticket, listing) {
                    tracing::debug!(path = %path, "applied directory listing");
                    Ok(Transition::Applied)
                } else {
                    tracing::debug!(path = %path, "dropping superseded directory listing");
                    Ok(Transition::Ignored)
                }
            }
            Err(err) => {
                if navigator.fail(&ticket) {
                    reject(&mut st, err)
                } else {
                    Ok(Transition::Ignored)
                }
            }
        }
    }

    /// Fold a live event into the monitoring status. Returns false once the
    /// listener has nothing left to do.
    fn apply_status(&self, epoch: u64, event: StatusEvent) -> bool {
        let mut st = self.state.lock();
        if st.epoch != epoch {
            return false;
        }
        let Step::Monitoring { status, .. } = &mut st.step else {
            return false;
        };
        if !status.advances_to(event.status) {
            tracing::trace!(current = %status, received = %event.status, "ignoring non-advancing status");
            return !status.is_terminal();
        }
        *status = event.status;
        tracing::info!(project = %event.project_id, status = %event.status, "deployment status");
        // No receivers is fine.
        let _ = self.statuses.send(event.status);
        !event.status.is_terminal()
    }
}

fn configure_navigator(step: &mut Step) -> Option<&mut Navigator> {
    match step {
        Step::Configure { target, .. } => target.navigator_mut(),
        _ => None,
    }
}

fn status_sink(inner: Weak<Inner>, epoch: u64) -> impl FnMut(StatusEvent) -> bool + Send + 'static {
    move |event| match inner.upgrade() {
        Some(inner) => inner.apply_status(epoch, event),
        None => false,
    }
}

/// The step `back_to(to)` lands on from `step`, if permitted.
fn plan_back(step: &Step, to: StepKind, typed_domain: &str) -> Result<Step, WizardError> {
    if let Step::Monitoring { status, .. } = step {
        if status.is_terminal() {
            return Err(WizardError::validation(
                "The deployment has finished. Close the wizard to start a new one.",
            ));
        }
    }
    let from = step.kind();
    if to.depth() >= from.depth() {
        return Err(WizardError::validation(format!(
            "Cannot go back from {from} to {to}."
        )));
    }
    let managed = match step {
        Step::SelectMethod | Step::DomainEntry { .. } => true,
        Step::SelectHosting { .. } => false,
        Step::Configure { target, .. } | Step::Monitoring { target, .. } => target.is_managed(),
    };
    match (to, step) {
        (StepKind::SelectMethod, _) => Ok(Step::SelectMethod),
        (StepKind::DomainEntry, _) if managed => Ok(Step::DomainEntry {
            domain: typed_domain.to_string(),
        }),
        (StepKind::SelectHosting, _) if !managed => Ok(Step::SelectHosting {
            credentials: Vec::new(),
        }),
        (StepKind::Configure, Step::Monitoring { target, form, .. }) => Ok(Step::Configure {
            target: target.clone(),
            form: form.clone(),
        }),
        _ => Err(WizardError::validation(format!(
            "The {to} step is not part of this deployment path."
        ))),
    }
}

impl Wizard {
    pub fn new(ctx: WizardContext, project: ProjectId) -> Self {
        let (statuses, _) = broadcast::channel(STATUS_BUFFER);
        Self {
            inner: Arc::new(Inner {
                ctx,
                project,
                state: Mutex::new(WizardState {
                    step: Step::SelectMethod,
                    epoch: 0,
                    notice: None,
                    resume: None,
                    typed_domain: String::new(),
                    subscription: None,
                }),
                busy: AtomicBool::new(false),
                statuses,
                dispatch: Mutex::new(None),
            }),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.inner.project
    }

    pub fn snapshot(&self) -> Snapshot {
        let st = self.inner.state.lock();
        let browsing = st
            .step
            .target()
            .and_then(Target::navigator)
            .is_some_and(Navigator::is_browsing);
        Snapshot {
            step: st.step.clone(),
            busy: self.inner.busy.load(Ordering::Acquire),
            browsing,
            notice: st.notice.clone(),
            resume: st.resume.clone(),
        }
    }

    /// Every applied status change, in order.
    pub fn status_updates(&self) -> broadcast::Receiver<DeploymentStatus> {
        self.inner.statuses.subscribe()
    }

    // -----------------------------------------------------------------------
    // Open / close
    // -----------------------------------------------------------------------

    /// Start over at `SelectMethod` and look for a deployment to resume.
    pub async fn open(&self) -> Result<Transition, WizardError> {
        let (epoch, previous) = self.inner.reset();
        if let Some(subscription) = previous {
            subscription.release().await;
        }
        tracing::debug!(project = %self.inner.project, "wizard opened");

        match self.lookup_resume().await {
            Ok(hint) => {
                let mut st = self.inner.state.lock();
                if st.epoch != epoch {
                    return Ok(Transition::Ignored);
                }
                if let Some(hint) = &hint {
                    tracing::info!(project = %self.inner.project, hosting = %hint.hosting_id, "found previous deployment");
                }
                st.resume = hint;
            }
            Err(err) => {
                tracing::warn!(project = %self.inner.project, error = %err, "could not look up previous deployment");
            }
        }
        Ok(Transition::Applied)
    }

    async fn lookup_resume(&self) -> Result<Option<ResumeHint>, WizardError> {
        let ctx = &self.inner.ctx;
        let Some(hosting_id) = ctx
            .backend
            .get_current_hosting(&ctx.token, &self.inner.project)
            .await?
        else {
            return Ok(None);
        };
        let config = ConfigResolver::new(ctx)
            .resolve(&self.inner.project, Some(&hosting_id))
            .await?;
        Ok(config.map(|config| ResumeHint { hosting_id, config }))
    }

    /// Leave the live channel if joined and reset. In-flight calls are not
    /// cancelled; their responses are dropped.
    pub async fn close(&self) {
        let (_, previous) = self.inner.reset();
        if let Some(subscription) = previous {
            subscription.release().await;
        }
        tracing::debug!(project = %self.inner.project, "wizard closed");
    }

    // -----------------------------------------------------------------------
    // Method selection
    // -----------------------------------------------------------------------

    pub async fn choose_managed(&self) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let mut st = self.inner.state.lock();
        if st.step.kind() != StepKind::SelectMethod {
            let err = wrong_step(StepKind::SelectMethod, &st.step);
            return reject(&mut st, err);
        }
        st.notice = None;
        st.step = Step::DomainEntry {
            domain: st.typed_domain.clone(),
        };
        Ok(Transition::Applied)
    }

    pub async fn choose_own_hosting(&self) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let epoch = {
            let mut st = self.inner.state.lock();
            if st.step.kind() != StepKind::SelectMethod {
                let err = wrong_step(StepKind::SelectMethod, &st.step);
                return reject(&mut st, err);
            }
            st.notice = None;
            st.epoch
        };

        let result = CredentialDirectory::new(&self.inner.ctx).list().await;

        let mut st = self.inner.state.lock();
        if st.epoch != epoch {
            return Ok(Transition::Ignored);
        }
        match result {
            Ok(credentials) => {
                st.step = Step::SelectHosting { credentials };
                Ok(Transition::Applied)
            }
            Err(err) => reject(&mut st, err),
        }
    }

    // -----------------------------------------------------------------------
    // Managed branch
    // -----------------------------------------------------------------------

    /// Check `raw`, connect it to the project and move to `Configure`.
    pub async fn submit_domain(&self, raw: &str) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let epoch = {
            let mut st = self.inner.state.lock();
            if st.step.kind() != StepKind::DomainEntry {
                let err = wrong_step(StepKind::DomainEntry, &st.step);
                return reject(&mut st, err);
            }
            st.notice = None;
            st.typed_domain = raw.to_string();
            st.step = Step::DomainEntry {
                domain: raw.to_string(),
            };
            st.epoch
        };
        let ctx = &self.inner.ctx;
        let project = &self.inner.project;

        let domain = match DomainChecker::new(ctx).ensure_available(raw).await {
            Ok(domain) => domain,
            Err(err) => return self.inner.fail(epoch, err),
        };
        if !self.inner.is_current(epoch) {
            return Ok(Transition::Ignored);
        }
        let assignment = match ManagedHostingResolver::new(ctx).connect(project, &domain).await {
            Ok(assignment) => assignment,
            Err(err) => return self.inner.fail(epoch, err),
        };

        let (linked, display) = match CredentialDirectory::new(ctx).list().await {
            Ok(credentials) => (
                managed_credential(&credentials).cloned(),
                managed_display_credential(&credentials).cloned(),
            ),
            Err(err) => {
                tracing::warn!(project = %project, error = %err, "could not list credentials for managed hosting");
                (None, None)
            }
        };
        let deployment_id = match ConfigResolver::new(ctx)
            .resolve(project, linked.as_ref().map(|c| &c.id))
            .await
        {
            Ok(config) => config.map(|c| c.deployment_id),
            Err(err) => {
                tracing::warn!(project = %project, error = %err, "could not look up managed deployment config");
                None
            }
        };

        let assigned_domain = normalize_domain(&assignment.domain);
        let form = TargetForm {
            domain: if assigned_domain.is_empty() {
                domain.to_string()
            } else {
                assigned_domain
            },
            root_path: assignment.root_path,
            deployment_id,
        };

        let mut st = self.inner.state.lock();
        if st.epoch != epoch {
            return Ok(Transition::Ignored);
        }
        st.step = Step::Configure {
            target: Target::Managed { linked, display },
            form,
        };
        Ok(Transition::Applied)
    }

    // -----------------------------------------------------------------------
    // Own-hosting branch
    // -----------------------------------------------------------------------

    /// Pick a credential, prefill from its existing deployment and list its
    /// root directory.
    pub async fn select_hosting(&self, hosting_id: &HostingId) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let (epoch, credentials, credential) = {
            let mut st = self.inner.state.lock();
            let listed = match &st.step {
                Step::SelectHosting { credentials } => Ok(credentials.clone()),
                other => Err(wrong_step(StepKind::SelectHosting, other)),
            };
            let credentials = match listed {
                Ok(credentials) => credentials,
                Err(err) => return reject(&mut st, err),
            };
            let Some(credential) = credentials.iter().find(|c| &c.id == hosting_id).cloned() else {
                return reject(
                    &mut st,
                    WizardError::validation(format!("Unknown hosting credential '{hosting_id}'.")),
                );
            };

            // Drop everything from the previous credential before any I/O.
            st.epoch += 1;
            st.notice = None;
            let navigator = credential.exposes_filesystem().then(Navigator::default);
            st.step = Step::Configure {
                target: Target::Own {
                    credential: credential.clone(),
                    navigator,
                },
                form: TargetForm::default(),
            };
            (st.epoch, credentials, credential)
        };
        let ctx = &self.inner.ctx;
        let project = &self.inner.project;
        tracing::debug!(project = %project, hosting = %credential.id, kind = %credential.connection_type(), "hosting selected");

        let prior = match ConfigResolver::new(ctx)
            .resolve(project, Some(&credential.id))
            .await
        {
            Ok(prior) => prior,
            Err(err) => return self.revert_to_hosting(epoch, credentials, err),
        };
        if !self.inner.is_current(epoch) {
            return Ok(Transition::Ignored);
        }
        if let Err(err) = ctx
            .backend
            .set_current_hosting(&ctx.token, project, &credential.id)
            .await
        {
            return self.revert_to_hosting(epoch, credentials, err.into());
        }

        let ticket = {
            let mut st = self.inner.state.lock();
            if st.epoch != epoch {
                return Ok(Transition::Ignored);
            }
            let Step::Configure { target, form } = &mut st.step else {
                return Ok(Transition::Ignored);
            };
            if let Some(prior) = &prior {
                tracing::info!(project = %project, hosting = %credential.id, deployment = %prior.deployment_id, "reusing existing deployment config");
                *form = TargetForm::from_config(prior);
            }
            match target.navigator_mut() {
                Some(navigator) => Some(navigator.root()),
                None => {
                    if form.root_path.trim().is_empty() {
                        form.root_path = ctx.default_root_path.clone();
                    }
                    None
                }
            }
        };

        match ticket {
            Some(ticket) => {
                let result = DirectoryBrowser::new(ctx)
                    .list(&credential.id, &ticket.path)
                    .await;
                self.inner.settle_browse(epoch, ticket, result)
            }
            None => Ok(Transition::Applied),
        }
    }

    fn revert_to_hosting(
        &self,
        epoch: u64,
        credentials: Vec<HostingCredential>,
        err: WizardError,
    ) -> Result<Transition, WizardError> {
        let mut st = self.inner.state.lock();
        if st.epoch != epoch {
            return Ok(Transition::Ignored);
        }
        st.step = Step::SelectHosting { credentials };
        reject(&mut st, err)
    }

    // -----------------------------------------------------------------------
    // Directory navigation (configure step, browsable targets)
    // -----------------------------------------------------------------------

    pub async fn open_directory(&self, node: &DirectoryNode) -> Result<Transition, WizardError> {
        self.navigate(|navigator| Some(navigator.open(node))).await
    }

    pub async fn open_breadcrumb(&self, index: usize) -> Result<Transition, WizardError> {
        self.navigate(|navigator| navigator.breadcrumb(index)).await
    }

    /// Parent directory; a no-op at the root.
    pub async fn go_up(&self) -> Result<Transition, WizardError> {
        self.navigate(Navigator::up).await
    }

    async fn navigate<F>(&self, issue: F) -> Result<Transition, WizardError>
    where
        F: FnOnce(&mut Navigator) -> Option<BrowseTicket>,
    {
        let (epoch, request) = {
            let mut st = self.inner.state.lock();
            let epoch = st.epoch;
            let prepared = match &mut st.step {
                Step::Configure {
                    target:
                        Target::Own {
                            credential,
                            navigator: Some(navigator),
                        },
                    ..
                } => Ok(issue(navigator).map(|ticket| (credential.id.clone(), ticket))),
                Step::Configure { .. } => Err(WizardError::validation(
                    "This hosting target has no browsable file system.",
                )),
                other => Err(wrong_step(StepKind::Configure, other)),
            };
            match prepared {
                Ok(request) => (epoch, request),
                Err(err) => return reject(&mut st, err),
            }
        };
        let Some((hosting, ticket)) = request else {
            return Ok(Transition::Ignored);
        };

        let result = DirectoryBrowser::new(&self.inner.ctx)
            .list(&hosting, &ticket.path)
            .await;
        self.inner.settle_browse(epoch, ticket, result)
    }

    // -----------------------------------------------------------------------
    // Form editing
    // -----------------------------------------------------------------------

    fn with_form<T>(
        &self,
        edit: impl FnOnce(&Target, &mut TargetForm) -> Result<T, WizardError>,
    ) -> Result<T, WizardError> {
        let mut st = self.inner.state.lock();
        let result = match &mut st.step {
            Step::Configure { target, form } => edit(target, form),
            other => Err(wrong_step(StepKind::Configure, other)),
        };
        match result {
            Ok(value) => {
                st.notice = None;
                Ok(value)
            }
            Err(err) => reject(&mut st, err),
        }
    }

    /// Copy the displayed directory into the root-path field.
    pub fn select_current_path(&self) -> Result<String, WizardError> {
        self.with_form(|target, form| {
            let root = target
                .navigator()
                .map(Navigator::selected_root)
                .ok_or_else(|| {
                    WizardError::validation("This hosting target has no browsable file system.")
                })?;
            form.root_path = root.clone();
            Ok(root)
        })
    }

    pub fn set_domain(&self, raw: &str) -> Result<(), WizardError> {
        self.with_form(|_, form| {
            form.domain = raw.to_string();
            Ok(())
        })
    }

    pub fn set_root_path(&self, raw: &str) -> Result<(), WizardError> {
        self.with_form(|_, form| {
            form.root_path = raw.trim().to_string();
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Deploy
    // -----------------------------------------------------------------------

    /// Validate, enter `Monitoring`, resolve the deployment id and dispatch
    /// the build. Returns once the build request has been handed to a
    /// background task; see [`wait_dispatched`](Self::wait_dispatched).
    pub async fn deploy(&self) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let (epoch, target, mut form) = {
            let mut st = self.inner.state.lock();
            let current = match &st.step {
                Step::Configure { target, form } => Ok((target.clone(), form.clone())),
                other => Err(wrong_step(StepKind::Configure, other)),
            };
            let (target, form) = match current {
                Ok(current) => current,
                Err(err) => return reject(&mut st, err),
            };
            st.notice = None;
            (st.epoch, target, form)
        };
        let ctx = &self.inner.ctx;
        let project = &self.inner.project;

        // 1. Own hosting re-checks availability; managed was checked on entry.
        let mut checked: Option<DomainName> = None;
        if !target.is_managed() {
            match DomainChecker::new(ctx).ensure_available(&form.domain).await {
                Ok(domain) => checked = Some(domain),
                Err(err) => return self.inner.fail(epoch, err),
            }
        }

        // 2. Managed fields left empty come from the assignment.
        if target.is_managed() && (form.domain.trim().is_empty() || form.root_path.trim().is_empty()) {
            match ManagedHostingResolver::new(ctx).assigned(project).await {
                Ok(Some(assignment)) => {
                    if form.domain.trim().is_empty() {
                        form.domain = assignment.domain;
                    }
                    if form.root_path.trim().is_empty() {
                        form.root_path = assignment.root_path;
                    }
                }
                Ok(None) => {}
                Err(err) => return self.inner.fail(epoch, err),
            }
        }

        // 3. Both fields are required.
        let domain = match checked.map_or_else(|| parse_domain(&form.domain), Ok) {
            Ok(domain) => domain,
            Err(err) => return self.inner.fail(epoch, err),
        };
        let root_path = form.root_path.trim().to_string();
        if root_path.is_empty() {
            return self
                .inner
                .fail(epoch, WizardError::validation("Please choose a root path."));
        }
        form.domain = domain.to_string();
        form.root_path = root_path.clone();

        // 4. Enter monitoring and join before anything can be emitted.
        let subscription = {
            let mut st = self.inner.state.lock();
            if st.epoch != epoch {
                return Ok(Transition::Ignored);
            }
            st.step = Step::Monitoring {
                target: target.clone(),
                form: form.clone(),
                status: DeploymentStatus::Unknown,
            };
            Subscription::start(
                ctx.live.clone(),
                project.clone(),
                status_sink(Arc::downgrade(&self.inner), epoch),
            )
        };
        tracing::info!(project = %project, domain = %domain, root = %root_path, "deployment started");

        if let Err(err) = subscription.join().await {
            subscription.release().await;
            return self.abort_to_configure(epoch, err.into()).await;
        }
        let stored = {
            let mut st = self.inner.state.lock();
            if st.epoch == epoch {
                Ok(st.subscription.replace(subscription))
            } else {
                Err(subscription)
            }
        };
        match stored {
            Ok(Some(leftover)) => leftover.release().await,
            Ok(None) => {}
            Err(subscription) => {
                subscription.release().await;
                return Ok(Transition::Ignored);
            }
        }

        // 4a/4b. Deployment id: reuse, link, or re-query once.
        let deployment_id = match form.deployment_id.clone() {
            Some(id) => id,
            None => match self.link_deployment(&target, &domain, &root_path).await {
                Ok(Some(id)) => id,
                Ok(None) => return self.abort_to_configure(epoch, WizardError::Resolution).await,
                Err(err) => return self.abort_to_configure(epoch, err).await,
            },
        };
        {
            let mut st = self.inner.state.lock();
            if st.epoch != epoch {
                return Ok(Transition::Ignored);
            }
            if let Step::Monitoring { form, .. } = &mut st.step {
                form.deployment_id = Some(deployment_id.clone());
            }
        }

        // 4c-4e. Fire and forget; progress arrives on the live channel.
        self.dispatch(epoch, deployment_id, domain);
        Ok(Transition::Applied)
    }

    async fn link_deployment(
        &self,
        target: &Target,
        domain: &DomainName,
        root_path: &str,
    ) -> Result<Option<DeploymentId>, WizardError> {
        let ctx = &self.inner.ctx;
        let project = &self.inner.project;
        let resolver = ConfigResolver::new(ctx);

        let Some(credential) = target.credential() else {
            return Ok(resolver.resolve(project, None).await?.map(|c| c.deployment_id));
        };
        let outcome = ctx
            .backend
            .link_project_to_hosting(&ctx.token, &credential.id, project, domain, root_path)
            .await?;
        tracing::info!(project = %project, hosting = %credential.id, linked = outcome.deployment_id.is_some(), "project linked to hosting");
        if let Some(id) = outcome.deployment_id {
            return Ok(Some(id));
        }
        Ok(resolver
            .resolve(project, Some(&credential.id))
            .await?
            .map(|c| c.deployment_id))
    }

    fn dispatch(&self, epoch: u64, deployment: DeploymentId, domain: DomainName) {
        let ctx = &self.inner.ctx;
        let backend = ctx.backend.clone();
        let token = ctx.token.clone();
        let project = self.inner.project.clone();
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            if let Err(err) = backend
                .trigger_build_and_upload(&token, &deployment, &project)
                .await
            {
                tracing::warn!(project = %project, deployment = %deployment, error = %err, "build trigger failed");
                if let Some(inner) = weak.upgrade() {
                    Wizard { inner }.trigger_failed(epoch, err.into()).await;
                }
                return;
            }
            if let Err(err) = backend.update_project_domain(&token, &domain, &project).await {
                tracing::warn!(project = %project, domain = %domain, error = %err, "project domain update failed");
            }
            match backend.generate_sitemap(&token, &project).await {
                Ok(sitemap) => {
                    tracing::debug!(project = %project, pages = sitemap.slugs.len(), "sitemap generated")
                }
                Err(err) => {
                    tracing::warn!(project = %project, error = %err, "sitemap generation failed")
                }
            }
        });

        // An earlier attempt's follow-ups keep running detached.
        *self.inner.dispatch.lock() = Some(task);
    }

    /// Wait for the background build dispatch of the last deploy, if any.
    pub async fn wait_dispatched(&self) {
        let task = self.inner.dispatch.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "build dispatch task failed");
            }
        }
    }

    async fn trigger_failed(&self, epoch: u64, err: WizardError) {
        let released = {
            let mut st = self.inner.state.lock();
            if st.epoch != epoch {
                return;
            }
            let reverted = match &st.step {
                Step::Monitoring {
                    target,
                    form,
                    status: DeploymentStatus::Unknown,
                } => Some(Step::Configure {
                    target: target.clone(),
                    form: form.clone(),
                }),
                _ => None,
            };
            st.notice = Some(err.notice());
            match reverted {
                Some(step) => {
                    st.step = step;
                    st.subscription.take()
                }
                None => None,
            }
        };
        if let Some(subscription) = released {
            subscription.release().await;
        }
    }

    async fn abort_to_configure(
        &self,
        epoch: u64,
        err: WizardError,
    ) -> Result<Transition, WizardError> {
        let released = {
            let mut st = self.inner.state.lock();
            if st.epoch != epoch {
                return Ok(Transition::Ignored);
            }
            let reverted = match &st.step {
                Step::Monitoring { target, form, .. } => Some(Step::Configure {
                    target: target.clone(),
                    form: form.clone(),
                }),
                _ => None,
            };
            if let Some(step) = reverted {
                st.step = step;
            }
            st.notice = Some(err.notice());
            st.subscription.take()
        };
        tracing::warn!(project = %self.inner.project, error = %err, "deployment aborted");
        if let Some(subscription) = released {
            subscription.release().await;
        }
        Err(err)
    }

    // -----------------------------------------------------------------------
    // Back navigation
    // -----------------------------------------------------------------------

    /// Return to an earlier step on the current branch.
    pub async fn back_to(&self, to: StepKind) -> Result<Transition, WizardError> {
        let Some(_busy) = self.inner.begin() else {
            return Ok(Transition::Ignored);
        };
        let (epoch, released, relist) = {
            let mut st = self.inner.state.lock();
            let next = match plan_back(&st.step, to, &st.typed_domain) {
                Ok(next) => next,
                Err(err) => return reject(&mut st, err),
            };
            let leaving_monitoring = st.step.kind() == StepKind::Monitoring;
            let relist = next.kind() == StepKind::SelectHosting;
            st.epoch += 1;
            st.notice = None;
            st.step = next;
            let released = if leaving_monitoring {
                st.subscription.take()
            } else {
                None
            };
            (st.epoch, released, relist)
        };
        tracing::debug!(project = %self.inner.project, step = %to, "navigated back");
        if let Some(subscription) = released {
            subscription.release().await;
        }
        if !relist {
            return Ok(Transition::Applied);
        }

        let result = CredentialDirectory::new(&self.inner.ctx).list().await;
        let mut st = self.inner.state.lock();
        if st.epoch != epoch {
            return Ok(Transition::Ignored);
        }
        match result {
            Ok(listed) => {
                if let Step::SelectHosting { credentials } = &mut st.step {
                    *credentials = listed;
                }
                Ok(Transition::Applied)
            }
            Err(err) => reject(&mut st, err),
        }
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("project", &self.inner.project)
            .field("step", &self.inner.state.lock().step.kind())
            .finish_non_exhaustive()
    }
}
