use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Local, Utc};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use shared::types::{MessageKind, PeerSummary, RoutePreference, RouterRecord};
use crate::config::DisplayConfig;
use crate::stats::NdpStats;

const TABLE_WIDTH: usize = 140;
const ADDRESS_WIDTH: usize = 40;

/// How often the key watcher rechecks whether it should stop
const KEY_POLL: Duration = Duration::from_millis(200);

const KNOWN_GROUPS: &[(&str, &str)] = &[
    ("ff02::1", "All Nodes"),
    ("ff02::2", "All Routers"),
    ("ff02::5", "OSPFv3"),
    ("ff02::6", "OSPFv3 DR"),
    ("ff02::9", "RIPng"),
    ("ff02::a", "EIGRP"),
    ("ff02::c", "SSDP/UPnP"),
    ("ff02::d", "PIM"),
    ("ff02::12", "VRRP"),
    ("ff02::16", "MLDv2"),
    ("ff02::6a", "VRRP"),
    ("ff02::fb", "mDNS"),
    ("ff02::102", "HSRPv6"),
    ("ff02::1:2", "DHCPv6"),
    ("ff02::1:3", "LLMNR"),
    ("ff05::1:3", "DHCP Site"),
];

/// One multicast group and how many peers reported it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembers {
    pub group: String,
    pub members: usize,
}

/// Raw mode until dropped
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Alternate screen with a hidden cursor until dropped
struct AltScreen<W: Write> {
    out: W,
}

impl<W: Write> AltScreen<W> {
    fn enter(out: W) -> Result<Self> {
        let mut screen = AltScreen { out };
        execute!(screen.out, EnterAlternateScreen, cursor::Hide)
            .context("Failed to enter alternate screen")?;
        Ok(screen)
    }
}

impl<W: Write> Drop for AltScreen<W> {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, LeaveAlternateScreen);
    }
}

/// Redraw the table every `refresh` until cancelled or until the user quits
/// with `q`, Esc or Ctrl-C. Quitting cancels `cancel` for the whole daemon.
///
/// The terminal is restored on every return, errors included.
pub async fn run(stats: Arc<NdpStats>, config: DisplayConfig, cancel: CancellationToken) -> Result<()> {
    let raw = RawMode::enable()?;
    let screen = AltScreen::enter(io::stdout())?;

    let stop_keys = cancel.child_token();
    let keys = {
        let quit = cancel.clone();
        let stop = stop_keys.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_keys(&quit, &stop) {
                tracing::warn!("Keyboard input unavailable: {}", e);
            }
        })
    };

    let mut refresh = tokio::time::interval(config.refresh());
    let result = loop {
        tokio::select! {
            _ = refresh.tick() => {
                let table = render_table(&stats.snapshot(), &stats.routers_snapshot(), stats.window(), Utc::now());
                if let Err(e) = draw(&mut io::stdout().lock(), &table) {
                    break Err(e);
                }
            }
            _ = cancel.cancelled() => {
                break Ok(());
            }
        }
    };

    stop_keys.cancel();
    let _ = keys.await;
    drop(screen);
    drop(raw);

    tracing::info!("Display shutting down");
    result
}

/// Repaint from the top-left. Raw mode does no newline translation, so each
/// line is placed explicitly.
fn draw(out: &mut impl Write, table: &str) -> Result<()> {
    let mut rows: u16 = 0;
    for line in table.lines() {
        queue!(
            out,
            cursor::MoveTo(0, rows),
            Print(line),
            terminal::Clear(ClearType::UntilNewLine)
        )
        .context("Failed to write to terminal")?;
        rows = rows.saturating_add(1);
    }
    queue!(out, cursor::MoveTo(0, rows), terminal::Clear(ClearType::FromCursorDown))
        .context("Failed to write to terminal")?;
    out.flush().context("Failed to flush terminal")
}

fn watch_keys(quit: &CancellationToken, stop: &CancellationToken) -> Result<()> {
    while !stop.is_cancelled() {
        if !event::poll(KEY_POLL).context("Failed to poll terminal events")? {
            continue;
        }
        if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
            if is_quit_key(&key) {
                tracing::info!("Quit requested from keyboard");
                quit.cancel();
                break;
            }
        }
    }
    Ok(())
}

/// `q`, Esc, or Ctrl-C (raw mode swallows SIGINT)
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Render peers, multicast groups and routers as a fixed-width text table.
pub fn render_table(
    peers: &[PeerSummary],
    routers: &[RouterRecord],
    window: Duration,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let rule = "─".repeat(TABLE_WIDTH);

    let _ = writeln!(
        out,
        "NDP/MLD Statistics (window: {}, updated: {})",
        format_duration(window),
        format_time(now)
    );
    let _ = writeln!(out, "{}", rule);

    if peers.is_empty() && routers.is_empty() {
        let _ = writeln!(out, "No NDP/MLD traffic observed yet...");
        return out;
    }

    let _ = write!(out, "{:<40} {:<17}", "IPv6 Address", "MAC");
    for kind in MessageKind::ALL {
        let _ = write!(out, " {:>4}", kind.short_name());
    }
    let _ = writeln!(out, " {:>5}  {:<8}  {:<8}", "Total", "First", "Last");
    let _ = writeln!(out, "{}", rule);

    for peer in peers {
        let _ = write!(
            out,
            "{:<40} {:<17}",
            truncate(&peer.address, ADDRESS_WIDTH),
            peer.mac.as_deref().unwrap_or("-")
        );
        for kind in MessageKind::ALL {
            let _ = write!(out, " {:>4}", peer.count(kind));
        }
        let _ = writeln!(
            out,
            " {:>5}  {:<8}  {:<8}",
            peer.total,
            format_time(peer.first_seen),
            format_time(peer.last_seen)
        );
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Total peers: {}", peers.len());

    let groups = aggregate_multicast_groups(peers);
    if !groups.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Multicast Groups:");
        for entry in &groups {
            let noun = if entry.members == 1 { "host" } else { "hosts" };
            let _ = writeln!(
                out,
                "  {:<40} {:<16} {} {}",
                truncate(&entry.group, ADDRESS_WIDTH),
                multicast_label(&entry.group).unwrap_or(""),
                entry.members,
                noun
            );
        }
    }

    if !routers.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Routers:");
        for router in routers {
            render_router(&mut out, router);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Press q to quit");
    out
}

fn render_router(out: &mut String, router: &RouterRecord) {
    let mut flags = Vec::new();
    if router.managed {
        flags.push("M");
    }
    if router.other {
        flags.push("O");
    }

    let _ = write!(
        out,
        "  {:<40} {:<17} hop {:<3} flags {:<3} lifetime {}",
        truncate(&router.address, ADDRESS_WIDTH),
        router.mac.as_deref().unwrap_or("-"),
        router.hop_limit,
        if flags.is_empty() { "-".to_string() } else { flags.join("") },
        format_duration(router.lifetime)
    );
    if let Some(mtu) = router.mtu {
        let _ = write!(out, " mtu {}", mtu);
    }
    if let Some(interface) = &router.interface {
        let _ = write!(out, " [{}]", interface);
    }
    let _ = writeln!(out);

    for prefix in &router.prefixes {
        let mut flags = String::new();
        if prefix.on_link {
            flags.push('L');
        }
        if prefix.autonomous {
            flags.push('A');
        }
        let _ = writeln!(
            out,
            "      prefix {:<43} {:<2} valid {} preferred {}",
            prefix.prefix,
            flags,
            format_duration(prefix.valid_lifetime),
            format_duration(prefix.preferred_lifetime)
        );
    }
    for route in &router.routes {
        let _ = writeln!(
            out,
            "      route  {:<43} {:<6} lifetime {}",
            route.prefix,
            preference_label(route.preference),
            format_duration(route.lifetime)
        );
    }
    if !router.rdnss.is_empty() {
        let _ = writeln!(out, "      rdnss  {}", router.rdnss.join(", "));
    }
}

fn preference_label(preference: RoutePreference) -> &'static str {
    match preference {
        RoutePreference::High => "high",
        RoutePreference::Medium => "medium",
        RoutePreference::Low => "low",
        RoutePreference::Reserved => "rsvd",
    }
}

/// Count peers per multicast group; most members first, then by group text.
pub fn aggregate_multicast_groups(peers: &[PeerSummary]) -> Vec<GroupMembers> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for peer in peers {
        for group in &peer.groups {
            *counts.entry(group.as_str()).or_default() += 1;
        }
    }

    let mut entries: Vec<GroupMembers> = counts
        .into_iter()
        .map(|(group, members)| GroupMembers { group: group.to_string(), members })
        .collect();
    entries.sort_by(|a, b| b.members.cmp(&a.members).then_with(|| a.group.cmp(&b.group)));
    entries
}

/// Friendly name for well-known groups. Any ff02::1:ff.. address is a
/// solicited-node group.
pub fn multicast_label(group: &str) -> Option<&'static str> {
    KNOWN_GROUPS
        .iter()
        .find(|(known, _)| *known == group)
        .map(|(_, label)| *label)
        .or_else(|| group.starts_with("ff02::1:ff").then_some("Solicited-Node"))
}

/// Compact duration: 45s, 15m, 2m30s, 1h, 1h30m
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, mins, rest) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        if mins > 0 {
            format!("{}h{}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else if mins > 0 {
        if rest > 0 {
            format!("{}m{}s", mins, rest)
        } else {
            format!("{}m", mins)
        }
    } else {
        format!("{}s", rest)
    }
}

/// Cut to `max` characters, ending in "..." when shortened
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S").to_string()
}
