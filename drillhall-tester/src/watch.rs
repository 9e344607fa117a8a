//! Real-time play of a single run, combat auto-advancing on the tokio clock.
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use drillhall_game::{Actor, Outcome, Record, SlotStorage, TurnEngine, drive_combat_with};

use crate::logic::policy::{PlayerPolicy, PolicyChoice};

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub max_turns: u32,
    /// Pause between training turns.
    pub turn_delay: Duration,
    /// Pause before each combat exchange.
    pub combat_tick: Duration,
}

/// What a watched run ended with.
#[derive(Debug, Clone)]
pub struct WatchReport {
    pub turns: u32,
    pub loops_cleared: u32,
    pub record: Option<Record>,
}

/// Play until the run ends or the turn cap, echoing narrative lines to `writer`.
pub async fn watch_run<S, W>(
    engine: &mut TurnEngine<S>,
    policy: &mut dyn PlayerPolicy,
    config: WatchConfig,
    writer: &mut W,
) -> Result<WatchReport>
where
    S: SlotStorage,
    W: Write + ?Sized,
{
    let mut printed_logs = flush_logs(engine, 0, writer)?;

    while !engine.is_game_over() && engine.turn() <= config.max_turns {
        let decision = {
            let options = engine.available_actions();
            policy.pick(engine.state(), &options)
        };
        let outcome = match &decision.choice {
            PolicyChoice::Perform(action_id) => engine.perform_action(action_id),
            PolicyChoice::Rest => engine.rest(),
        };
        if matches!(outcome, Outcome::Rejected(_)) {
            engine.rest();
        }
        printed_logs = flush_logs(engine, printed_logs, writer)?;
        write_status(engine, writer)?;

        if engine.combat_pending() {
            printed_logs = fight(engine, config.combat_tick, printed_logs, writer).await?;
        }

        writer.flush()?;
        if !config.turn_delay.is_zero() {
            tokio::time::sleep(config.turn_delay).await;
        }
    }

    let record = if engine.is_game_over() {
        engine.records().last().cloned()
    } else {
        writeln!(writer, "{}", format!("Stopped at turn cap {}", config.max_turns).yellow())?;
        None
    };
    if let Some(record) = &record {
        writeln!(
            writer,
            "{} {} | rank {} | turns {} | loops {}",
            "🏁".bold(),
            record.result.to_string().bright_white().bold(),
            record.rank.bright_yellow(),
            record.total_turns,
            record.loops_cleared
        )?;
    }
    writer.flush()?;

    Ok(WatchReport {
        turns: engine.turn(),
        loops_cleared: engine.loop_count(),
        record,
    })
}

async fn fight<S, W>(
    engine: &mut TurnEngine<S>,
    tick: Duration,
    printed_logs: usize,
    writer: &mut W,
) -> Result<usize>
where
    S: SlotStorage,
    W: Write + ?Sized,
{
    if let Some(boss) = engine.boss() {
        writeln!(
            writer,
            "{} {} (HP {} ATK {} DEF {})",
            "⚔️ ".red(),
            boss.name.bright_red().bold(),
            boss.hp,
            boss.attack,
            boss.defense
        )?;
        writer.flush()?;
    }

    let mut shown = 0;
    let mut failure = None;
    // a victory clears the log, so its final exchange is never echoed
    drive_combat_with(engine, tick, |engine, _| {
        if failure.is_some() {
            return;
        }
        let entries = engine.combat_log();
        for entry in entries.get(shown..).unwrap_or_default() {
            let line = match entry.actor {
                Actor::Player => entry.message.green(),
                Actor::Boss => entry.message.red(),
            };
            let written = writeln!(writer, "   [{:>3}] {line}", entry.round);
            if let Err(err) = written.and_then(|()| writer.flush()) {
                failure = Some(err);
                return;
            }
        }
        shown = entries.len();
    })
    .await;
    if let Some(err) = failure {
        return Err(err.into());
    }

    flush_logs(engine, printed_logs, writer)
}

fn flush_logs<S, W>(engine: &TurnEngine<S>, printed: usize, writer: &mut W) -> Result<usize>
where
    S: SlotStorage,
    W: Write + ?Sized,
{
    let logs = engine.logs();
    for line in logs.get(printed..).unwrap_or_default() {
        writeln!(writer, "{line}")?;
    }
    Ok(logs.len())
}

fn write_status<S, W>(engine: &TurnEngine<S>, writer: &mut W) -> Result<()>
where
    S: SlotStorage,
    W: Write + ?Sized,
{
    let character = engine.character();
    let stats = &character.stats;
    writeln!(
        writer,
        "   {} HP {}/{} AP {}/{} Stress {} Depth {} | RES {} SEN {} OBE {} TOL {} COR {} POW {}",
        "·".dimmed(),
        character.health,
        character.max_health,
        engine.resources().ap,
        engine.resources().max_ap,
        character.stress,
        character.depth,
        stats.resistance,
        stats.sensitivity,
        stats.obedience,
        stats.tolerance,
        stats.corruption,
        stats.power
    )?;
    Ok(())
}
