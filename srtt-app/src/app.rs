use crate::cli::Cli;
use crate::persist::{self, ResultFiles};
use crate::terminal::{RawModeGuard, TerminalDisplay, TerminalInput};
use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use srtt_core::{ExperimentError, Position};
use srtt_experiment::{
    InputContext, ParticipantProfile, Session, SessionConfig, SessionOutcome, SessionStatus,
    simulated_pair,
};
use srtt_timing::{HighPrecisionTimer, ManualTimer, Timer};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

pub struct App {
    cli: Cli,
    config: SessionConfig,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = cli.session_config()?;
        Ok(Self { cli, config })
    }

    pub fn run(self) -> Result<()> {
        let participant_id = match &self.cli.participant {
            Some(id) => id.clone(),
            None => prompt_participant()?,
        };
        let seed = self.cli.seed.unwrap_or_else(|| rand::rng().random());
        info!(seed, simulate = self.cli.simulate, "starting");

        if self.cli.simulate {
            self.run_simulated(participant_id, seed)
        } else {
            self.run_terminal(participant_id, seed)
        }
    }

    fn run_terminal(&self, participant_id: String, seed: u64) -> Result<()> {
        let timer = HighPrecisionTimer::new();
        let mut session = Session::new(
            participant_id,
            self.config.clone(),
            timer.clone(),
            StdRng::seed_from_u64(seed),
        )?;
        let mut input = TerminalInput::new(timer);
        let mut display = TerminalDisplay::new(self.config.keys.clone());
        let started = Local::now();

        let result = {
            let _guard = RawModeGuard::enable()?;
            display.show(&instructions(&self.config));
            match input.wait_to_continue() {
                Ok(true) => session.run(&mut input, &mut display),
                Ok(false) => Ok(SessionOutcome {
                    status: SessionStatus::Aborted,
                    blocks: Vec::new(),
                }),
                Err(e) => Err(e),
            }
        };
        self.finish(&session, started, result)
    }

    fn run_simulated(&self, participant_id: String, seed: u64) -> Result<()> {
        let timer = ManualTimer::new();
        let (mut participant, mut screen) = simulated_pair(
            timer.clone(),
            self.config.keys.clone(),
            ParticipantProfile::default(),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        );
        let mut session = Session::new(
            participant_id,
            self.config.clone(),
            timer,
            StdRng::seed_from_u64(seed),
        )?;
        let started = Local::now();
        let result = session.run(&mut participant, &mut screen);
        self.finish(&session, started, result)
    }

    /// Persists whatever was recorded, then reports. Records are written even
    /// when the session ended on an error, and the summary is printed even
    /// when writing fails.
    fn finish<T, R>(
        &self,
        session: &Session<T, R>,
        started: DateTime<Local>,
        result: Result<SessionOutcome, ExperimentError>,
    ) -> Result<()>
    where
        T: Timer<Timestamp = u64>,
        R: Rng,
    {
        let recorder = session.recorder();
        let summary = session.summarize();
        let saved = if recorder.is_empty() {
            Ok(None)
        } else {
            persist::write_results(
                &self.cli.output,
                session.participant_id(),
                started,
                &recorder.export_rows(),
                &summary,
            )
            .map(Some)
        };
        if let Err(e) = &saved {
            error!(
                error = %format!("{e:#}"),
                records = recorder.len(),
                "writing results failed"
            );
        }

        match &result {
            Ok(outcome) if outcome.status == SessionStatus::Aborted => {
                println!("Session stopped early. Recorded attempts are kept.");
            }
            Ok(_) => println!("Session complete. Thank you!"),
            Err(e) => {
                error!(error = %e, records = recorder.len(), "session failed");
                println!("Session ended with an error: {e}");
            }
        }
        println!();
        println!("{summary}");
        match &saved {
            Ok(files) => report_files(files.as_ref()),
            Err(e) => println!("Results could not be written: {e:#}"),
        }

        settle(result, saved)
    }
}

/// The session's own error outranks a failure to write its results.
fn settle(
    result: Result<SessionOutcome, ExperimentError>,
    saved: Result<Option<ResultFiles>>,
) -> Result<()> {
    result?;
    saved.map(|_| ())
}

fn report_files(files: Option<&ResultFiles>) {
    match files {
        Some(files) => {
            println!("Log:     {}", files.log.display());
            println!("Summary: {}", files.summary.display());
        }
        None => println!("Nothing was recorded."),
    }
}

fn prompt_participant() -> Result<String> {
    print!("Participant ID: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let id = line.trim();
    if id.is_empty() {
        bail!("a participant ID is required");
    }
    Ok(id.to_owned())
}

fn instructions(config: &SessionConfig) -> Vec<String> {
    let keys: Vec<String> = (0..config.position_count)
        .filter_map(|i| config.keys.symbol_for(Position::new(i)))
        .map(|c| c.to_string())
        .collect();
    vec![
        "Serial reaction-time task".to_owned(),
        String::new(),
        format!(
            "A box among {} will light up. Press its key as fast and as accurately as you can.",
            config.position_count
        ),
        format!("Keys from left to right: {}", keys.join(" ")),
        format!(
            "{} blocks of {} trials, with a break after each block.",
            config.block_count, config.trials_per_block
        ),
        String::new(),
        "Press SPACE to begin or ESC to quit.".to_owned(),
    ]
}
