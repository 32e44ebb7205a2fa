//! Status line composition.
//!
//! Two stages like a small pipeline: `compose_status` produces ordered
//! [`StatusSegment`]s, `format_status` joins them. Hosts that want a
//! different layout (or to truncate) work on the segments.

/// What the status line needs to know about the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusContext<'a> {
    pub year: i32,
    pub loading: bool,
    /// Writes launched but not yet confirmed.
    pub in_flight: usize,
    /// Writes that failed and were rolled back.
    pub failed: usize,
    /// Name of the category new events are assigned to.
    pub category: Option<&'a str>,
    /// Ephemeral message (expires on the host's tick).
    pub message: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSegment<'a> {
    Year(i32),
    Loading,
    Syncing(usize),
    Failed(usize),
    Category(&'a str),
    Message(&'a str),
}

pub fn compose_status<'a>(ctx: &StatusContext<'a>) -> Vec<StatusSegment<'a>> {
    let mut out = vec![StatusSegment::Year(ctx.year)];
    if ctx.loading {
        out.push(StatusSegment::Loading);
    }
    if ctx.in_flight > 0 {
        out.push(StatusSegment::Syncing(ctx.in_flight));
    }
    if ctx.failed > 0 {
        out.push(StatusSegment::Failed(ctx.failed));
    }
    if let Some(name) = ctx.category {
        out.push(StatusSegment::Category(name));
    }
    if let Some(message) = ctx.message {
        out.push(StatusSegment::Message(message));
    }
    out
}

pub fn format_status(segments: &[StatusSegment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            StatusSegment::Year(year) => format!("[{year}]"),
            StatusSegment::Loading => "loading…".to_string(),
            StatusSegment::Syncing(n) => format!("syncing {n}"),
            StatusSegment::Failed(n) => format!("{n} failed (r: retry)"),
            StatusSegment::Category(name) => format!("category: {name}"),
            StatusSegment::Message(message) => (*message).to_string(),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn build_status_line(ctx: &StatusContext<'_>) -> String {
    format_status(&compose_status(ctx))
}
