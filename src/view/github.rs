//! Contribution heatmap: profile header plus a weekly activity grid,
//! fed by the GitHub GraphQL API.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{
    DisplayHints, HINT_FIELDS, ImagePayload, ParamField, ParamKind, RenderOutcome, RenderResult,
    View, ViewError, encode_png, format_count, parse_params, signature_now,
};
use crate::canvas::{self, Canvas};
use crate::font::{FontQuery, FontService};

const SCHEMA: [ParamField; 7] = [
    ParamField { name: "github_username", kind: ParamKind::String, required: true },
    ParamField { name: "github_token", kind: ParamKind::String, required: true },
    ParamField { name: "api_url", kind: ParamKind::String, required: false },
    HINT_FIELDS[0],
    HINT_FIELDS[1],
    HINT_FIELDS[2],
    HINT_FIELDS[3],
];

const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// y of the separator between the profile header and the grid.
const HEADER_HEIGHT: i32 = 60;
const GRID_GAP: i32 = 2;
const MIN_CELL: i32 = 4;

const QUERY: &str = r"
query($username: String!) {
  user(login: $username) {
    login
    followers { totalCount }
    repositories(first: 100, ownerAffiliations: OWNER, privacy: PUBLIC) {
      nodes { stargazerCount }
    }
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
";

#[derive(Debug, Deserialize)]
struct GithubParams {
    github_username: String,
    github_token: String,
    api_url: Option<String>,
    #[serde(flatten)]
    hints: DisplayHints,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    user: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    login: String,
    #[serde(default)]
    followers: Followers,
    #[serde(default)]
    repositories: Repositories,
    #[serde(default)]
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Followers {
    total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Repositories {
    nodes: Vec<Repository>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    #[serde(default)]
    stargazer_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Default, Deserialize)]
struct ContributionCalendar {
    weeks: Vec<Week>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Week {
    contribution_days: Vec<Day>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Day {
    #[serde(default)]
    contribution_count: u32,
}

/// Bucket a daily count into the four drawable darkness levels.
fn contribution_level(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=3 => 1,
        4..=9 => 2,
        _ => 3,
    }
}

pub struct GithubContributionsView {
    fonts: Arc<FontService>,
}

impl GithubContributionsView {
    pub fn new(fonts: Arc<FontService>) -> Self {
        Self { fonts }
    }

    fn fetch(&self, params: &GithubParams) -> Result<User, String> {
        let url = params.api_url.as_deref().unwrap_or(DEFAULT_GRAPHQL_URL);
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| err.to_string())?;

        let body = serde_json::json!({
            "query": QUERY,
            "variables": { "username": params.github_username },
        });
        let response = client
            .post(url)
            .bearer_auth(&params.github_token)
            .json(&body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| err.to_string())?;

        let parsed: GraphQlResponse = response.json().map_err(|err| err.to_string())?;
        if let Some(errors) = parsed.errors {
            if !errors.is_empty() {
                return Err(format!("GraphQL error: {errors:?}"));
            }
        }
        parsed
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| format!("no such user: {}", params.github_username))
    }

    fn render(&self, user: &User) -> Result<Vec<u8>, ViewError> {
        let mut canvas = Canvas::new();

        let name_font = self.fonts.resolve(&FontQuery::sized(16));
        let stats_font = self.fonts.resolve(&FontQuery::sized(12));

        let total_stars: u64 = user.repositories.nodes.iter().map(|r| r.stargazer_count).sum();
        canvas.draw_text(&name_font, 10, 8, &user.login);
        canvas.draw_text(
            &stats_font,
            10,
            28,
            &format!("Followers: {}", format_count(user.followers.total_count)),
        );
        canvas.draw_text(&stats_font, 10, 44, &format!("Stars: {}", format_count(total_stars)));
        canvas.hline(0, HEADER_HEIGHT, canvas::WIDTH);

        self.draw_grid(&mut canvas, &user.contributions_collection.contribution_calendar.weeks);

        encode_png(&canvas)
    }

    fn draw_grid(&self, canvas: &mut Canvas, weeks: &[Week]) {
        let grid_top = HEADER_HEIGHT + 8;
        let grid_bottom = canvas::HEIGHT as i32 - 5;
        let available_width = canvas::WIDTH as i32 - 10;
        let available_height = grid_bottom - grid_top;

        let cell = ((available_height - 6 * GRID_GAP) / 7).max(MIN_CELL);
        let max_weeks = ((available_width + GRID_GAP) / (cell + GRID_GAP)) as usize;
        let num_weeks = max_weeks.min(weeks.len());
        if num_weeks == 0 {
            // No room or no data: the header alone is the card.
            return;
        }

        let recent = &weeks[weeks.len() - num_weeks..];
        let total_width = num_weeks as i32 * (cell + GRID_GAP) - GRID_GAP;
        let grid_left = (canvas::WIDTH as i32 - total_width) / 2;

        for (week_index, week) in recent.iter().enumerate() {
            for (day_index, day) in week.contribution_days.iter().enumerate() {
                let x = grid_left + week_index as i32 * (cell + GRID_GAP);
                let y = grid_top + day_index as i32 * (cell + GRID_GAP);
                canvas.contribution_cell(x, y, cell as u32, contribution_level(day.contribution_count));
            }
        }
    }

    fn render_error_card(&self) -> Result<Vec<u8>, ViewError> {
        let mut canvas = Canvas::new();
        let error_font = self.fonts.resolve(&FontQuery::sized(16));
        let small_font = self.fonts.resolve(&FontQuery::sized(12));
        let stamp_font = self.fonts.resolve(&FontQuery::sized(10));

        canvas.draw_text_centered(&error_font, 50, "GitHub API Error");
        canvas.draw_text_centered(&small_font, 80, "Check credentials");
        canvas.draw_text(
            &stamp_font,
            canvas::WIDTH as i32 - 40,
            canvas::HEIGHT as i32 - 15,
            &signature_now(),
        );
        encode_png(&canvas)
    }
}

impl View for GithubContributionsView {
    fn schema(&self) -> &'static [ParamField] {
        &SCHEMA
    }

    fn execute(&self, params: serde_json::Value) -> Result<RenderOutcome, ViewError> {
        let params: GithubParams = parse_params("github_contributions", params)?;

        match self.fetch(&params) {
            Ok(user) => {
                let png = self.render(&user)?;
                Ok(RenderOutcome::ok(RenderResult::Image(ImagePayload {
                    png,
                    hints: params.hints,
                })))
            }
            Err(reason) => {
                log::warn!("github_contributions: fetch failed, rendering error card: {reason}");
                let png = self.render_error_card()?;
                Ok(RenderOutcome::degraded(
                    RenderResult::Image(ImagePayload { png, hints: params.hints }),
                    reason,
                ))
            }
        }
    }
}
