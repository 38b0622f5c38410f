//! Beer detail pane — right panel with the rating controls.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use cask_core::{
  rating::{Category, Score, SubmitState},
  store::CatalogStore,
};

use crate::app::App;

// ─── Public entry ─────────────────────────────────────────────────────────────

/// Render the detail pane into `area`.
pub fn draw<S: CatalogStore>(f: &mut Frame, area: Rect, app: &App<S>) {
  let Some(beer) = app.selected_beer_id.and_then(|id| app.catalog.beer(id))
  else {
    return;
  };

  let block = Block::default()
    .title(format!(" {} ", beer.name))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let label = |text: &str| {
    Span::styled(
      format!("{text:<12}"),
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
  };
  let dim = Style::default().fg(Color::DarkGray);

  let mut lines: Vec<Line> = vec![
    Line::from(vec![label("brewery"), Span::raw(beer.brewery.clone())]),
    Line::from(vec![
      label("country"),
      Span::raw(app.catalog.country_name(&beer.country_iso).to_string()),
    ]),
    Line::from(vec![label("style"), Span::raw(beer.style.clone())]),
    Line::from(vec![
      label("abv"),
      Span::raw(
        beer
          .abv
          .map(|abv| format!("{abv:.1}%"))
          .unwrap_or_else(|| "unknown".into()),
      ),
    ]),
  ];

  if !beer.tags.is_empty() {
    lines.push(Line::from(vec![
      label("tags"),
      Span::styled(beer.tags.join(", "), dim),
    ]));
  }
  if let Some(description) = &beer.description {
    lines.push(Line::from(vec![label("about"), Span::raw(description.clone())]));
  }

  // Aggregate quadruple across all raters, as the backend maintains it.
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    "Everyone",
    Style::default().add_modifier(Modifier::BOLD),
  )));
  for (name, value) in [
    ("overall", beer.overall_rating),
    ("aroma", beer.aroma_rating),
    ("taste", beer.taste_rating),
    ("aftertaste", beer.after_taste_rating),
  ] {
    let rendered = value
      .map(|v| format!("{} {v:.2}", stars_bar(v)))
      .unwrap_or_else(|| "no ratings yet".into());
    lines.push(Line::from(vec![label(name), Span::styled(rendered, dim)]));
  }

  // The rater's own stars.
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    "Your rating",
    Style::default().add_modifier(Modifier::BOLD),
  )));

  if let Some(draft) = &app.draft {
    for category in Category::ALL {
      lines.push(draft_line(
        category,
        draft.get(category),
        category == app.rating_focus,
      ));
    }

    let overall = draft
      .complete()
      .map(|r| format!("{:.2}", r.overall()))
      .unwrap_or_else(|| "—".into());
    lines.push(Line::from(vec![label("overall"), Span::raw(overall)]));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(submit_hint(app.submit), dim)));
  } else {
    lines.push(Line::from(Span::styled(
      "Sign in (--user) to rate this beer.",
      dim,
    )));
  }

  f.render_widget(Paragraph::new(lines), inner);
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn draft_line(
  category: Category,
  score: Option<Score>,
  focused: bool,
) -> Line<'static> {
  let marker = if focused { "▸ " } else { "  " };
  let name_style = if focused {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(Color::Cyan)
  };

  let rendered = match score {
    Some(score) => format!("{} {}", stars_bar(score.stars()), score),
    None => "☆☆☆☆☆ not rated".to_string(),
  };

  Line::from(vec![
    Span::raw(marker.to_string()),
    Span::styled(format!("{:<12}", category.label()), name_style),
    Span::raw(rendered),
  ])
}

/// Five-star bar with a half-star marker, e.g. `★★★½☆`.
fn stars_bar(value: f64) -> String {
  let halves = (value * 2.0).round().clamp(0.0, 10.0) as usize;
  let full = halves / 2;
  let half = halves % 2 == 1;

  let mut bar = "★".repeat(full);
  if half {
    bar.push('½');
  }
  let used = full + usize::from(half);
  bar.push_str(&"☆".repeat(5usize.saturating_sub(used)));
  bar
}

fn submit_hint(state: SubmitState) -> &'static str {
  match state {
    SubmitState::Editing => "Rate aroma, taste, and aftertaste to save.",
    SubmitState::Pending => "Saving…",
    SubmitState::Committed => "Saved.",
    SubmitState::Failed => "Save failed — touch any star to retry.",
  }
}
