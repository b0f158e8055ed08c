use askama::Template;
use tb_core::models::{Actor, TipSummary};
use tb_core::permissions;

/// One tip as the home page renders it, with the viewer's options resolved.
#[derive(Debug, Clone)]
pub struct TipView {
    pub id: String,
    /// Already escaped; rendered with `|safe`
    pub content_html: String,
    pub author_name: String,
    pub created_at: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub upvoted: bool,
    pub downvoted: bool,
    pub can_downvote: bool,
    pub can_delete: bool,
}

impl TipView {
    pub fn new(summary: &TipSummary, viewer: &Actor) -> Self {
        let tip = &summary.tip;
        let (can_downvote, can_delete) = match viewer.user() {
            Some(user) => (permissions::may_downvote(user, tip), permissions::may_delete(user, tip)),
            None => (false, false),
        };
        Self {
            id: tip.id.to_string(),
            content_html: format_content(&tip.content),
            author_name: summary.author_name.clone(),
            created_at: tip.created_at.format("%Y-%m-%d %H:%M").to_string(),
            upvotes: summary.tally.upvotes,
            downvotes: summary.tally.downvotes,
            upvoted: summary.viewer_vote.is_upvoted(),
            downvoted: summary.viewer_vote.is_downvoted(),
            can_downvote,
            can_delete,
        }
    }
}

/// Escapes HTML and keeps the author's line breaks.
pub fn format_content(raw: &str) -> String {
    html_escape::encode_safe(raw)
        .lines()
        .collect::<Vec<_>>()
        .join("<br />")
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub username: &'a str,
    pub authenticated: bool,
    pub reputation: Option<u32>,
    pub tips: &'a [TipView],
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub username: &'a str,
    pub authenticated: bool,
    pub error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationTemplate<'a> {
    pub username: &'a str,
    pub authenticated: bool,
    pub error: Option<&'a str>,
}
