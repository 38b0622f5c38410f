//! Beer list pane — left panel.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use cask_core::{store::CatalogStore, view};

use crate::app::App;

/// Render the beer list into `area`.
pub fn draw<S: CatalogStore>(f: &mut Frame, area: Rect, app: &App<S>) {
  let visible = app.visible();
  let total = app.catalog.beers().len();

  // Title with count and the active sort order.
  let title = if visible.len() != total {
    format!(" Beers ({}/{}) · {} ", visible.len(), total, app.query.sort.label())
  } else {
    format!(" Beers ({}) · {} ", total, app.query.sort.label())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  // Build list items: name, brewery, country code, global and personal
  // overall ratings.
  let items: Vec<ListItem> = visible
    .iter()
    .enumerate()
    .map(|(i, beer)| {
      let global =
        view::rating_or_aggregate(app.catalog.global_ratings(), beer);
      let global = if global > 0.0 {
        format!("{global:.1}")
      } else {
        " – ".to_string()
      };
      let mine = app
        .catalog
        .personal_ratings()
        .get(&beer.id)
        .map(|r| format!("{r:.1}"))
        .unwrap_or_else(|| " – ".to_string());

      let text = format!(
        "{:<24.24} {:<16.16} {:<3} ⌀{:>4} ★{:>4}",
        beer.name, beer.brewery, beer.country_iso, global, mine,
      );

      let style = if i == app.list_cursor {
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD)
      } else {
        Style::default()
      };

      ListItem::new(Line::from(Span::styled(text, style)))
    })
    .collect();

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  // Search and filter bar at the bottom of the inner area.
  let needs_bar = app.search_active
    || !app.query.search.is_empty()
    || !app.query.filters.is_empty();
  if needs_bar && inner_area.height > 2 {
    let bar_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let mut bar = if app.search_active {
      format!("/{}_", app.query.search)
    } else if !app.query.search.is_empty() {
      format!("/{}", app.query.search)
    } else {
      String::new()
    };
    for filter in &app.query.filters {
      if !bar.is_empty() {
        bar.push(' ');
      }
      bar.push_str(&format!("{}={}", filter.field.label(), filter.value));
    }

    f.render_widget(
      Paragraph::new(bar).style(Style::default().fg(Color::Yellow)),
      bar_area,
    );
  }

  // Scrollable list with cursor tracking.
  let mut state = ListState::default();
  state.select(if visible.is_empty() {
    None
  } else {
    Some(app.list_cursor)
  });

  f.render_stateful_widget(
    List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol(""),
    inner_area,
    &mut state,
  );
}
