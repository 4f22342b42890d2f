use anyhow::Result;
use std::io::{BufRead, Write};

use labeller_core::RankedCategory;
use labeller_pipeline::{ReviewEvent, ReviewSession};

/// What the reviewer typed for one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    Keep,
    Event(ReviewEvent),
    Quit,
}

/// Interpret one answer. A number picks the shown suggestion with that
/// index, `f` toggles the flag, `q` stops, anything else is a category.
pub fn parse_choice(input: &str, row: usize, shown: &[&RankedCategory], flagged: bool) -> Choice {
    let s = input.trim();
    match s {
        "" => Choice::Keep,
        "q" | "Q" => Choice::Quit,
        "f" | "F" => Choice::Event(ReviewEvent::SetFlag {
            row,
            flagged: !flagged,
        }),
        _ => {
            let picked = s
                .parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| shown.get(i));
            let category = match picked {
                Some(suggestion) => suggestion.category.clone(),
                None => s.to_string(),
            };
            Choice::Event(ReviewEvent::SelectCategory { row, category })
        }
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}: ", label)?;
    out.flush().ok();
    let mut s = String::new();
    if input.read_line(&mut s)? == 0 {
        return Ok(None);
    }
    Ok(Some(s.trim().to_string()))
}

/// Walk every row, showing suggestions above `min_probability`, until the
/// reviewer quits or input ends. Returns the number of rows visited.
pub fn run_review<R: BufRead, W: Write>(
    session: &mut ReviewSession,
    min_probability: f64,
    input: &mut R,
    out: &mut W,
) -> Result<usize> {
    let total = session.len();
    writeln!(out, "Known categories: {}", session.categories().join(", "))?;

    for row in 0..total {
        loop {
            let record = session.record(row)?;
            let flagged = record.flag;
            writeln!(out, "\n[{}/{}] {}", row + 1, total, record.name)?;
            if let Some(date) = record.date {
                writeln!(out, "  date: {}", date)?;
            }
            if let Some(amount) = record.amount {
                writeln!(out, "  amount: {:.2}", amount)?;
            }
            writeln!(
                out,
                "  category: {}{}",
                record.category,
                if flagged { "  [flagged]" } else { "" }
            )?;

            let shown = session.suggestions(row, min_probability)?;
            for (i, s) in shown.iter().enumerate() {
                writeln!(out, "  {}) {} {:.1}%", i + 1, s.category, s.probability * 100.0)?;
            }

            let Some(answer) =
                prompt(input, out, "number, category, f=flag, q=quit, enter=keep")?
            else {
                return Ok(row);
            };
            match parse_choice(&answer, row, &shown, flagged) {
                Choice::Keep => break,
                Choice::Quit => return Ok(row),
                // Show the row again so a flag toggle can be followed by a choice.
                Choice::Event(event @ ReviewEvent::SetFlag { .. }) => session.apply(event)?,
                Choice::Event(event) => {
                    session.apply(event)?;
                    break;
                }
            }
        }
    }
    Ok(total)
}
