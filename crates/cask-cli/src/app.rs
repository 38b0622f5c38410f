//! Application state machine and event dispatcher.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;
use uuid::Uuid;

use cask_core::{
  beer::{Beer, Brewery, Country},
  feed::{Catalog, ChangeFeed},
  rating::{Category, RatingDraft, Score, SubmitState, UserRating},
  session::Session,
  store::CatalogStore,
  view::{self, FilterField, ListQuery},
};

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  /// Focus on the beer list; right pane is empty or shows a preview.
  BeerList,
  /// Focus on the beer detail pane with the rating controls.
  BeerDetail,
}

// ─── Filter prompt ────────────────────────────────────────────────────────────

/// Two-step filter input: pick a field, then type the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPrompt {
  /// `None` while the user is still picking the field.
  pub field: Option<FilterField>,
  pub value: String,
}

// ─── Feeds ────────────────────────────────────────────────────────────────────

/// Live subscriptions, drained between frames. Any of them may be absent
/// if the subscribe call failed; the one-shot snapshot still renders.
#[derive(Default)]
struct Feeds {
  beers:     Option<ChangeFeed<Beer>>,
  breweries: Option<ChangeFeed<Brewery>>,
  countries: Option<ChangeFeed<Country>>,
  ratings:   Option<ChangeFeed<UserRating>>,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<S: CatalogStore> {
  /// Current screen / keyboard focus.
  pub screen: Screen,

  /// Local cache of remote state, kept warm by the change feeds.
  pub catalog: Catalog,

  /// Search, filters, and sort for the list pane.
  pub query: ListQuery,

  pub session: Session,

  /// Whether the user is typing a search query.
  pub search_active: bool,

  /// Active filter input, if any.
  pub filter_prompt: Option<FilterPrompt>,

  /// Cursor position within the *visible* (filtered, sorted) beer list.
  pub list_cursor: usize,

  /// Beer shown in the detail pane.
  pub selected_beer_id: Option<Uuid>,

  /// Which rating dimension the star keys act on.
  pub rating_focus: Category,

  /// The rater's draft for the selected beer. `None` for guests.
  pub draft: Option<RatingDraft>,

  /// What happened to the last submission attempt.
  pub submit: SubmitState,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Shared store handle.
  pub store: Arc<S>,

  feeds: Feeds,
}

impl<S: CatalogStore> App<S> {
  /// Create an [`App`] with an empty catalog.
  pub fn new(store: S, session: Session) -> Self {
    Self {
      screen: Screen::BeerList,
      catalog: Catalog::new(),
      query: ListQuery::default(),
      session,
      search_active: false,
      filter_prompt: None,
      list_cursor: 0,
      selected_beer_id: None,
      rating_focus: Category::Aroma,
      draft: None,
      submit: SubmitState::Editing,
      status_msg: String::new(),
      store: Arc::new(store),
      feeds: Feeds::default(),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch the catalog snapshot and open the change feeds.
  ///
  /// Every failure degrades to an empty or partial collection plus a
  /// status message; nothing here aborts the UI.
  pub async fn load_initial(&mut self) {
    self.status_msg = "Loading catalog…".into();

    // Lookup tables first so beer rows can resolve display names.
    let breweries = self.store.list_breweries().await;
    match breweries {
      Ok(rows) => self.catalog.seed_breweries(rows),
      Err(e) => self.note_error("loading breweries", &e),
    }
    let countries = self.store.list_countries().await;
    match countries {
      Ok(rows) => self.catalog.seed_countries(rows),
      Err(e) => self.note_error("loading countries", &e),
    }
    let beer_types = self.store.list_beer_types().await;
    match beer_types {
      Ok(rows) => self.catalog.seed_beer_types(rows),
      Err(e) => self.note_error("loading beer types", &e),
    }
    let beers = self.store.list_beers().await;
    match beers {
      Ok(rows) => {
        self.catalog.seed_beers(rows);
        self.status_msg.clear();
      }
      Err(e) => self.note_error("loading beers", &e),
    }

    if let Some(user_id) = self.session.rater_id() {
      let ratings = self.store.list_ratings(user_id).await;
      match ratings {
        Ok(rows) => self.catalog.seed_personal(&rows),
        Err(e) => self.note_error("loading your ratings", &e),
      }
    }

    let beer_feed = self.store.subscribe_beers().await;
    match beer_feed {
      Ok(feed) => self.feeds.beers = Some(feed),
      Err(e) => self.note_error("subscribing to beers", &e),
    }
    let brewery_feed = self.store.subscribe_breweries().await;
    match brewery_feed {
      Ok(feed) => self.feeds.breweries = Some(feed),
      Err(e) => self.note_error("subscribing to breweries", &e),
    }
    let country_feed = self.store.subscribe_countries().await;
    match country_feed {
      Ok(feed) => self.feeds.countries = Some(feed),
      Err(e) => self.note_error("subscribing to countries", &e),
    }
    let rating_feed = self.store.subscribe_ratings().await;
    match rating_feed {
      Ok(feed) => self.feeds.ratings = Some(feed),
      Err(e) => self.note_error("subscribing to ratings", &e),
    }
  }

  fn note_error(&mut self, what: &str, err: &S::Error) {
    warn!(%err, "{what} failed");
    self.status_msg = format!("Error {what}: {err}");
  }

  /// Apply everything the feeds delivered since the last frame. Runs on
  /// the event loop between frames, so feed deliveries and key handling
  /// never mutate the collections concurrently.
  pub fn drain_feeds(&mut self) {
    if let Some(feed) = &mut self.feeds.breweries {
      while let Some(event) = feed.try_recv() {
        self.catalog.apply_brewery_event(event);
      }
    }
    if let Some(feed) = &mut self.feeds.countries {
      while let Some(event) = feed.try_recv() {
        self.catalog.apply_country_event(event);
      }
    }
    if let Some(feed) = &mut self.feeds.beers {
      while let Some(event) = feed.try_recv() {
        self.catalog.apply_beer_event(event);
      }
    }
    if let Some(rater) = self.session.rater_id() {
      if let Some(feed) = &mut self.feeds.ratings {
        while let Some(event) = feed.try_recv() {
          self.catalog.apply_rating_event(rater, event);
        }
      }
    }

    // Keep the cursor inside the (possibly shrunk) visible list, and drop
    // the detail pane if its beer was deleted remotely.
    let len = self.visible_len();
    if self.list_cursor >= len {
      self.list_cursor = len.saturating_sub(1);
    }
    if let Some(id) = self.selected_beer_id {
      if self.catalog.beer(id).is_none() {
        self.close_detail();
      }
    }
  }

  // ── Visible list ──────────────────────────────────────────────────────────

  /// The filtered, sorted beer list the UI renders.
  pub fn visible(&self) -> Vec<&Beer> {
    view::view(
      self.catalog.beers(),
      &self.query,
      self.catalog.personal_ratings(),
      self.catalog.global_ratings(),
    )
  }

  pub fn visible_len(&self) -> usize {
    self.visible().len()
  }

  /// The beer under the list cursor in the visible list, if any.
  pub fn cursor_beer_id(&self) -> Option<Uuid> {
    self.visible().get(self.list_cursor).map(|b| b.id)
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL)
      && key.code == KeyCode::Char('c')
    {
      return Ok(false);
    }

    // Input modes capture all printable keys.
    if self.search_active {
      return Ok(self.handle_search_key(key));
    }
    if self.filter_prompt.is_some() {
      return Ok(self.handle_filter_key(key));
    }

    match self.screen {
      Screen::BeerList => self.handle_list_key(key).await,
      Screen::BeerDetail => self.handle_detail_key(key).await,
    }
  }

  fn handle_search_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => {
        self.search_active = false;
        self.query.search.clear();
        self.list_cursor = 0;
      }
      KeyCode::Enter => {
        self.search_active = false;
        self.list_cursor = 0;
      }
      KeyCode::Backspace => {
        self.query.search.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.query.search.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
    true
  }

  fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
    let Some(mut prompt) = self.filter_prompt.take() else {
      return true;
    };

    match prompt.field {
      // Step one: pick the field. Country and brewery filters are
      // mutually exclusive, matching the filter modal this replaces.
      None => match key.code {
        KeyCode::Esc => {}
        KeyCode::Char('c') => {
          if self.query.filter(FilterField::Brewery).is_some() {
            self.status_msg =
              "Country filter unavailable while a brewery filter is active."
                .into();
          } else {
            prompt.field = Some(FilterField::Country);
            self.status_msg = self.filter_options(FilterField::Country);
            self.filter_prompt = Some(prompt);
          }
        }
        KeyCode::Char('b') => {
          if self.query.filter(FilterField::Country).is_some() {
            self.status_msg =
              "Brewery filter unavailable while a country filter is active."
                .into();
          } else {
            prompt.field = Some(FilterField::Brewery);
            self.status_msg = self.filter_options(FilterField::Brewery);
            self.filter_prompt = Some(prompt);
          }
        }
        KeyCode::Char('t') => {
          prompt.field = Some(FilterField::Style);
          self.status_msg = self.filter_options(FilterField::Style);
          self.filter_prompt = Some(prompt);
        }
        _ => self.filter_prompt = Some(prompt),
      },

      // Step two: type the value.
      Some(field) => match key.code {
        KeyCode::Esc => {}
        KeyCode::Enter => {
          if !prompt.value.is_empty() {
            self.query.set_filter(field, prompt.value);
            self.list_cursor = 0;
          }
        }
        KeyCode::Backspace => {
          prompt.value.pop();
          self.filter_prompt = Some(prompt);
        }
        KeyCode::Char(c) => {
          prompt.value.push(c);
          self.filter_prompt = Some(prompt);
        }
        _ => self.filter_prompt = Some(prompt),
      },
    }
    true
  }

  /// Values the chosen filter field can take, from the lookup tables the
  /// backend maintains for exactly this purpose.
  fn filter_options(&self, field: FilterField) -> String {
    let mut values: Vec<String> = match field {
      FilterField::Country => self
        .catalog
        .beers()
        .iter()
        .map(|b| b.country_iso.clone())
        .collect(),
      FilterField::Brewery => self
        .catalog
        .breweries()
        .values()
        .map(|b| b.name.clone())
        .collect(),
      FilterField::Style => self
        .catalog
        .beer_types()
        .iter()
        .map(|t| t.name.clone())
        .collect(),
    };
    values.sort();
    values.dedup();
    if values.is_empty() {
      return format!("No known {} values yet.", field.label());
    }
    if values.len() > 8 {
      values.truncate(8);
      values.push("…".into());
    }
    format!("{}: {}", field.label(), values.join(", "))
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      // Quit
      KeyCode::Char('q') => return Ok(false),

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.visible_len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        if self.list_cursor > 0 {
          self.list_cursor -= 1;
        }
      }

      // Open detail
      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(id) = self.cursor_beer_id() {
          self.open_detail(id).await;
        }
      }

      // Search
      KeyCode::Char('/') => {
        self.search_active = true;
        self.query.search.clear();
        self.list_cursor = 0;
      }

      // Filters
      KeyCode::Char('f') => {
        self.filter_prompt = Some(FilterPrompt { field: None, value: String::new() });
      }
      KeyCode::Char('F') => {
        self.query.clear_filters();
        self.list_cursor = 0;
      }

      // Sort
      KeyCode::Char('s') => {
        self.query.sort = self.query.sort.next();
        self.list_cursor = 0;
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_detail_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      // Quit
      KeyCode::Char('q') => return Ok(false),

      // Back to list
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.close_detail();
      }

      // Move focus between rating dimensions
      KeyCode::Down | KeyCode::Char('j') => {
        self.rating_focus = self.rating_focus.next();
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.rating_focus = self.rating_focus.prev();
      }

      // Whole-star input
      KeyCode::Char(c @ '1'..='5') => {
        let stars = f64::from(c as u8 - b'0');
        // In-range whole stars always construct.
        if let Ok(score) = Score::from_stars(stars) {
          self.apply_score(score).await;
        }
      }

      // Half-step adjustment
      KeyCode::Char('+') | KeyCode::Char('=') => {
        let score = match self.focused_score() {
          Some(current) => current.half_step_up(),
          None => Score::MIN,
        };
        self.apply_score(score).await;
      }
      KeyCode::Char('-') => {
        if let Some(current) = self.focused_score() {
          self.apply_score(current.half_step_down()).await;
        }
      }

      _ => {}
    }
    Ok(true)
  }

  fn focused_score(&self) -> Option<Score> {
    self.draft.as_ref().and_then(|d| d.get(self.rating_focus))
  }

  // ── Detail pane ───────────────────────────────────────────────────────────

  /// Transition to `BeerDetail` for `beer_id`, seeding the rating draft
  /// from the remote record when there is one.
  async fn open_detail(&mut self, beer_id: Uuid) {
    self.selected_beer_id = Some(beer_id);
    self.rating_focus = Category::Aroma;
    self.submit = SubmitState::Editing;
    self.draft = None;

    if let Some(user_id) = self.session.rater_id() {
      let mut draft = RatingDraft::new(user_id, beer_id);
      let fetched = self.store.fetch_rating(user_id, beer_id).await;
      match fetched {
        Ok(Some(rating)) => draft = RatingDraft::from_rating(&rating),
        Ok(None) => {}
        Err(e) => self.note_error("loading your rating", &e),
      }
      self.draft = Some(draft);
    }

    self.screen = Screen::BeerDetail;
  }

  fn close_detail(&mut self) {
    self.screen = Screen::BeerList;
    self.selected_beer_id = None;
    self.draft = None;
    self.submit = SubmitState::Editing;
  }

  // ── Submission ────────────────────────────────────────────────────────────

  /// Merge a score into the focused dimension and run the submission gate.
  ///
  /// The remote upsert is issued only when the merge completes the draft.
  /// On failure the draft keeps its values — touching any star re-runs the
  /// gate and re-attempts the write.
  async fn apply_score(&mut self, score: Score) {
    if !self.session.can_rate() {
      self.status_msg = "Sign in (--user) to rate.".into();
      return;
    }
    let Some(draft) = self.draft.as_mut() else {
      return;
    };

    match draft.set(self.rating_focus, score) {
      None => {
        self.submit = SubmitState::Editing;
        self.status_msg = "Rate all three dimensions to save.".into();
      }
      Some(rating) => {
        // Optimistic: the list shows the new overall before the remote
        // write resolves, and keeps it even if the write fails.
        self.catalog.note_personal(rating.beer_id, rating.overall());
        self.submit = SubmitState::Pending;

        match self.store.upsert_rating(rating).await {
          Ok(()) => {
            self.submit = SubmitState::Committed;
            self.status_msg = "Rating saved.".into();
          }
          Err(e) => {
            warn!(%e, "rating upsert failed");
            self.submit = SubmitState::Failed;
            self.status_msg =
              format!("Error saving rating: {e} — touch any star to retry.");
          }
        }
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use cask_core::{
    beer::{Beer, Brewery},
    memory::MemoryStore,
    session::Rater,
  };
  use crossterm::event::{KeyCode, KeyEvent};

  fn beer(id: Uuid, name: &str) -> Beer {
    Beer {
      id,
      name: name.into(),
      brewery_id: None,
      brewery: String::new(),
      country_iso: "PT".into(),
      style: "Lager".into(),
      description: None,
      abv: Some(5.0),
      tags: Vec::new(),
      image: None,
      overall_rating: Some(3.0),
      aroma_rating: None,
      taste_rating: None,
      after_taste_rating: None,
    }
  }

  fn rater_session() -> Session {
    Session::new(Some(Rater {
      id: Uuid::new_v4(),
      name: Some("alice".into()),
      anonymous: false,
    }))
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::from(code)
  }

  #[tokio::test]
  async fn rating_submission_waits_for_all_three_dimensions() {
    let store = MemoryStore::new();
    let beer_id = Uuid::new_v4();
    store.put_beer(beer(beer_id, "Coruja"));

    let mut app = App::new(store.clone(), rater_session());
    app.load_initial().await;
    app.open_detail(beer_id).await;

    // Aroma then taste: gate holds, nothing persisted.
    app.handle_key(key(KeyCode::Char('5'))).await.unwrap();
    app.handle_key(key(KeyCode::Char('j'))).await.unwrap();
    app.handle_key(key(KeyCode::Char('4'))).await.unwrap();
    assert_eq!(store.rating_count(), 0);
    assert_eq!(app.submit, SubmitState::Editing);

    // Aftertaste completes the draft: exactly one upsert.
    app.handle_key(key(KeyCode::Char('j'))).await.unwrap();
    app.handle_key(key(KeyCode::Char('3'))).await.unwrap();
    assert_eq!(store.rating_count(), 1);
    assert_eq!(app.submit, SubmitState::Committed);

    let user = app.session.rater_id().unwrap();
    let stored = store.fetch_rating(user, beer_id).await.unwrap().unwrap();
    assert_eq!(stored.overall(), 4.0);

    // Optimistic personal map is visible without waiting for the echo.
    assert_eq!(app.catalog.personal_ratings().get(&beer_id), Some(&4.0));
  }

  #[tokio::test]
  async fn guests_cannot_submit() {
    let store = MemoryStore::new();
    let beer_id = Uuid::new_v4();
    store.put_beer(beer(beer_id, "Coruja"));

    let mut app = App::new(store.clone(), Session::new(None));
    app.load_initial().await;
    app.open_detail(beer_id).await;

    app.handle_key(key(KeyCode::Char('5'))).await.unwrap();
    assert_eq!(store.rating_count(), 0);
    assert!(app.status_msg.contains("Sign in"));
  }

  #[tokio::test]
  async fn realtime_insert_appears_in_visible_list() {
    let store = MemoryStore::new();
    store.put_brewery(Brewery { id: Uuid::new_v4(), name: "Letra".into() });

    let mut app = App::new(store.clone(), Session::new(None));
    app.load_initial().await;
    assert_eq!(app.visible_len(), 0);

    store.put_beer(beer(Uuid::new_v4(), "Fresh Arrival"));
    app.drain_feeds();

    assert_eq!(app.visible_len(), 1);
    assert_eq!(app.visible()[0].name, "Fresh Arrival");
  }

  #[tokio::test]
  async fn remote_delete_closes_detail_pane() {
    let store = MemoryStore::new();
    let beer_id = Uuid::new_v4();
    store.put_beer(beer(beer_id, "Doomed"));

    let mut app = App::new(store.clone(), rater_session());
    app.load_initial().await;
    app.open_detail(beer_id).await;
    assert_eq!(app.screen, Screen::BeerDetail);

    store.remove_beer(beer_id);
    app.drain_feeds();

    assert_eq!(app.screen, Screen::BeerList);
    assert!(app.selected_beer_id.is_none());
  }

  #[tokio::test]
  async fn half_step_keys_adjust_focused_dimension() {
    let store = MemoryStore::new();
    let beer_id = Uuid::new_v4();
    store.put_beer(beer(beer_id, "Coruja"));

    let mut app = App::new(store.clone(), rater_session());
    app.load_initial().await;
    app.open_detail(beer_id).await;

    // '+' from unset starts at the half-star floor.
    app.handle_key(key(KeyCode::Char('+'))).await.unwrap();
    assert_eq!(app.focused_score(), Some(Score::MIN));

    app.handle_key(key(KeyCode::Char('+'))).await.unwrap();
    assert_eq!(app.focused_score().unwrap().stars(), 1.0);

    app.handle_key(key(KeyCode::Char('-'))).await.unwrap();
    assert_eq!(app.focused_score().unwrap().stars(), 0.5);
  }
}
