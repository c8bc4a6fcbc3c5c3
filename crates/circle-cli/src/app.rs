//! Application state machine and event dispatcher.
//!
//! Network work never blocks the event loop: every controller operation is
//! spawned onto the runtime, and the screen redraws from the controller's
//! shared state on each tick.

use std::sync::Arc;

use circle_core::{
  controller::{ProfileController, ProfileView, ToggleOutcome},
  session::ViewerSession,
  source::{ProfileEditor, ProfileSource, RelationshipMutator},
  user::{ProfileSubject, ProfileUpdate, UserId},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, info, warn};

/// Everything the app needs from the remote side.
pub trait Remote:
  ProfileSource + RelationshipMutator + ProfileEditor + 'static
{
}

impl<T> Remote for T where
  T: ProfileSource + RelationshipMutator + ProfileEditor + 'static
{
}

// ─── Modes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Looking at a profile.
  Profile,
  /// Typing a user id to jump to.
  Goto,
}

/// Results reported back by spawned tasks.
#[derive(Debug)]
pub enum AppEvent {
  SaveFailed(String),
}

// ─── Edit form ────────────────────────────────────────────────────────────────

pub const FORM_LABELS: [&str; 5] =
  ["Name", "Email", "Location", "Date of birth", "About me"];

/// Local buffer behind the edit modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditForm {
  pub fields:     [String; 5],
  pub focus:      usize,
  /// A save or close is in flight; input is ignored until it lands.
  pub submitting: bool,
  pub error:      Option<String>,
}

impl EditForm {
  pub fn from_subject(subject: &ProfileSubject) -> Self {
    let value = |v: &Option<String>| v.clone().unwrap_or_default();
    Self {
      fields: [
        value(&subject.name),
        value(&subject.email),
        value(&subject.location),
        value(&subject.date_of_birth),
        value(&subject.bio),
      ],
      ..Self::default()
    }
  }

  /// Only fields that differ from `original` are sent.
  pub fn to_update(&self, original: &ProfileSubject) -> ProfileUpdate {
    let changed = |field: &str, before: &Option<String>| {
      (field != before.as_deref().unwrap_or_default())
        .then(|| field.trim().to_string())
    };
    ProfileUpdate {
      name:          changed(&self.fields[0], &original.name),
      email:         changed(&self.fields[1], &original.email),
      location:      changed(&self.fields[2], &original.location),
      date_of_birth: changed(&self.fields[3], &original.date_of_birth),
      bio:           changed(&self.fields[4], &original.bio),
    }
  }

  fn next(&mut self) { self.focus = (self.focus + 1) % self.fields.len(); }

  fn prev(&mut self) {
    self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<R> {
  pub mode: Mode,

  /// Controller for the profile on screen.
  pub controller: ProfileController<R, R>,

  /// Profiles visited before the current one, most recent last.
  pub history: Vec<UserId>,

  /// Text typed into the go-to prompt.
  pub goto_input: String,

  /// Present while the edit modal is open.
  pub form: Option<EditForm>,

  /// Server base URL, used for avatar links.
  pub base_url: String,

  remote:  Arc<R>,
  session: ViewerSession,
  tasks:   JoinSet<()>,
  events:  mpsc::UnboundedReceiver<AppEvent>,
  tx:      mpsc::UnboundedSender<AppEvent>,
}

impl<R: Remote> App<R> {
  /// Create an [`App`] showing `subject`. Nothing is fetched until
  /// [`App::mount`].
  pub fn new(
    remote: Arc<R>,
    session: ViewerSession,
    subject: Option<UserId>,
    base_url: impl Into<String>,
  ) -> Self {
    let (tx, events) = mpsc::unbounded_channel();
    Self {
      mode: Mode::Profile,
      controller: ProfileController::new(
        subject,
        Arc::clone(&remote),
        Arc::clone(&remote),
        session.clone(),
      ),
      history: Vec::new(),
      goto_input: String::new(),
      form: None,
      base_url: base_url.into(),
      remote,
      session,
      tasks: JoinSet::new(),
      events,
      tx,
    }
  }

  /// The render model for the current profile, if loaded.
  pub fn view(&self) -> Option<ProfileView> { self.controller.view() }

  // ── Screen lifecycle ──────────────────────────────────────────────────────

  /// Start loading the current profile in the background.
  pub fn mount(&mut self) {
    let controller = self.controller.clone();
    self.tasks.spawn(async move {
      // Load failures are logged by the controller; the screen stays empty.
      let _ = controller.load().await;
    });
  }

  /// Tear the current screen down and mount a profile for `id`.
  fn navigate(&mut self, id: UserId, remember: bool) {
    if self.controller.subject_id() == Some(&id) {
      return;
    }
    info!(to = %id, "navigating");
    self.controller.teardown();
    if remember && let Some(current) = self.controller.subject_id() {
      self.history.push(current.clone());
    }
    self.form = None;
    self.controller = ProfileController::new(
      Some(id),
      Arc::clone(&self.remote),
      Arc::clone(&self.remote),
      self.session.clone(),
    );
    self.mount();
  }

  fn go_back(&mut self) {
    if let Some(previous) = self.history.pop() {
      self.navigate(previous, false);
    }
  }

  /// Leave the app: cancel everything in flight and forget the viewer.
  pub fn shutdown(&mut self) {
    self.controller.teardown();
    self.tasks.abort_all();
  }

  /// Housekeeping run once per frame.
  pub fn tick(&mut self) {
    while self.tasks.try_join_next().is_some() {}

    while let Ok(event) = self.events.try_recv() {
      match event {
        AppEvent::SaveFailed(message) => {
          if let Some(form) = &mut self.form {
            form.submitting = false;
            form.error = Some(message);
          }
        }
      }
    }

    // The controller closes the session only after its resync lands.
    if self.form.is_some() && !self.controller.edit_session().is_open() {
      self.form = None;
    }
  }

  /// Wait for every spawned task to finish, then tick.
  #[cfg(test)]
  pub async fn settle(&mut self) {
    while self.tasks.join_next().await.is_some() {}
    self.tick();
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL)
      && key.code == KeyCode::Char('c')
    {
      return false;
    }

    if self.form.is_some() {
      self.handle_form_key(key);
      return true;
    }

    match self.mode {
      Mode::Goto => self.handle_goto_key(key),
      Mode::Profile => self.handle_profile_key(key),
    }
  }

  fn handle_profile_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Char('f') => self.toggle_follow(),
      KeyCode::Char('e') => self.open_edit(),
      KeyCode::Char('r') => self.resync(),

      KeyCode::Char('g') | KeyCode::Char('/') => {
        self.mode = Mode::Goto;
        self.goto_input.clear();
      }
      KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Left => self.go_back(),

      _ => {}
    }
    true
  }

  fn handle_goto_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Profile;
        self.goto_input.clear();
      }
      KeyCode::Enter => {
        self.mode = Mode::Profile;
        let id = UserId::new(self.goto_input.trim());
        self.goto_input.clear();
        if !id.is_empty() {
          self.navigate(id, true);
        }
      }
      KeyCode::Backspace => {
        self.goto_input.pop();
      }
      KeyCode::Char(c) => self.goto_input.push(c),
      _ => {}
    }
    true
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    let Some(form) = &mut self.form else {
      return;
    };
    if form.submitting {
      return;
    }
    match key.code {
      KeyCode::Esc => self.close_edit(),
      KeyCode::Enter => self.save_edit(),
      KeyCode::Tab | KeyCode::Down => form.next(),
      KeyCode::BackTab | KeyCode::Up => form.prev(),
      KeyCode::Backspace => {
        form.fields[form.focus].pop();
      }
      KeyCode::Char(c) => form.fields[form.focus].push(c),
      _ => {}
    }
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  fn toggle_follow(&mut self) {
    let Some(view) = self.view() else {
      return;
    };
    if view.affordance.follow_action().is_none() || view.toggle_busy {
      return;
    }
    let controller = self.controller.clone();
    self.tasks.spawn(async move {
      match controller.toggle_follow().await {
        ToggleOutcome::Committed(action) => {
          debug!(action = action.label(), "toggle finished")
        }
        outcome => debug!(?outcome, "toggle did not commit"),
      }
    });
  }

  /// Manual refresh. Skipped while a toggle or an edit close is in flight,
  /// since those finish with a resync of their own.
  fn resync(&mut self) {
    let Some(view) = self.view() else {
      return;
    };
    let closing = self.form.as_ref().is_some_and(|f| f.submitting);
    if view.toggle_busy || closing {
      debug!("resync already pending; ignoring refresh");
      return;
    }
    let controller = self.controller.clone();
    self.tasks.spawn(async move {
      if let Err(e) = controller.resync_identities().await {
        warn!(error = %e, "manual resync failed");
      }
    });
  }

  fn open_edit(&mut self) {
    let Some(view) = self.view() else {
      return;
    };
    match self.controller.open_edit() {
      Ok(()) => self.form = Some(EditForm::from_subject(&view.subject)),
      Err(e) => debug!(error = %e, "edit not available"),
    }
  }

  /// Dismiss the modal; it disappears once the resync has landed.
  fn close_edit(&mut self) {
    if let Some(form) = &mut self.form {
      form.submitting = true;
    }
    let controller = self.controller.clone();
    self.tasks.spawn(async move {
      let _ = controller.close_edit().await;
    });
  }

  fn save_edit(&mut self) {
    let (Some(form), Some(view)) = (&mut self.form, self.controller.view())
    else {
      return;
    };
    let update = form.to_update(&view.subject);
    form.submitting = true;
    form.error = None;

    let controller = self.controller.clone();
    let remote = Arc::clone(&self.remote);
    let tx = self.tx.clone();
    let id = view.subject.id.clone();
    self.tasks.spawn(async move {
      if !update.is_empty()
        && let Err(e) = remote.update_profile(&id, update).await
      {
        warn!(subject = %id, error = %e, "profile update failed");
        let _ = tx.send(AppEvent::SaveFailed(e.to_string()));
        return;
      }
      let _ = controller.close_edit().await;
    });
  }
}
