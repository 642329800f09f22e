//! Scripted input sequences for headless runs.
//!
//! A script is a comma-separated list of steps, each optionally repeated with
//! `*count`: `right*30,swing,idle*10,up*5,build,reset`.

use anyhow::{bail, Context, Result};
use tilescape_core::Direction;
use tilescape_system_gameplay::FrameInput;

/// Single frame of a script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScriptStep {
    /// Feed this input to the frame update.
    Input(FrameInput),
    /// Rebuild the world from its layout instead of running a frame.
    Reset,
}

impl Default for ScriptStep {
    fn default() -> Self {
        Self::Input(FrameInput::default())
    }
}

/// Expands `script` into one step per frame.
pub(crate) fn parse(script: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for token in script.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let (name, count) = match token.split_once('*') {
            Some((name, count)) => {
                let count: usize = count
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid repeat count in `{token}`"))?;
                (name.trim(), count)
            }
            None => (token, 1),
        };
        let step = step(name).with_context(|| format!("invalid script step `{token}`"))?;
        steps.extend(std::iter::repeat(step).take(count));
    }
    Ok(steps)
}

fn step(name: &str) -> Result<ScriptStep> {
    let moving = |direction| {
        ScriptStep::Input(FrameInput {
            movement: Some(direction),
            ..FrameInput::default()
        })
    };
    let step = match name {
        "idle" => ScriptStep::default(),
        "up" => moving(Direction::Up),
        "down" => moving(Direction::Down),
        "left" => moving(Direction::Left),
        "right" => moving(Direction::Right),
        "swing" => ScriptStep::Input(FrameInput {
            swing: true,
            ..FrameInput::default()
        }),
        "build" => ScriptStep::Input(FrameInput {
            build: true,
            ..FrameInput::default()
        }),
        "reset" => ScriptStep::Reset,
        other => bail!("unknown step `{other}`"),
    };
    Ok(step)
}
