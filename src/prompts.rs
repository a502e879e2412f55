//! Prompt construction for the generate → review → refine loop.
//!
//! Everything here is pure string work so it can be tested without a model.

use crate::models::ReviewResult;

const SCHEMATIC_GUIDELINES: &[&str] = &[
    "Plain white background; no gradients, shadows or decorative elements.",
    "Every component labelled with short, legible sans-serif text.",
    "Consistent line weights, arrow heads and spacing between elements.",
    "Logical reading order (left-to-right or top-to-bottom) with no overlapping shapes.",
    "Colour used sparingly and only to encode meaning; must survive greyscale printing.",
    "Publication quality: crisp edges, high resolution, nothing cut off at the borders.",
];

/// Wraps the user's request with the house style for scientific figures.
pub fn build_generation_prompt(user_prompt: &str) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "Create a clean, professional scientific schematic diagram.\n\n{}",
        user_prompt.trim()
    ));

    let guidelines = SCHEMATIC_GUIDELINES
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    sections.push(format!("Style requirements:\n{guidelines}"));

    sections.join("\n\n")
}

/// Builds the next prompt from the current one and the reviewer's critique.
///
/// The result always contains `original` and `critique` verbatim plus an
/// `ITERATION <n>` marker, so the refinement history can be read back out of
/// the prompt alone.
pub fn improve_prompt(original: &str, critique: &str, iteration: u32) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(original.to_string());
    sections.push(format!(
        "ITERATION {iteration}: REVISION REQUIRED\n\
         A reviewer examined the previous version and asked for these changes:\n{critique}"
    ));
    sections.push(
        "Keep every element that already works. Address each point above \
         while keeping the style requirements."
            .to_string(),
    );

    sections.join("\n\n")
}

pub fn build_review_prompt(prompt: &str, threshold: f32) -> String {
    format!(
        "You are reviewing a generated scientific schematic for publication.\n\n\
         The image was generated from this request:\n{prompt}\n\n\
         Judge scientific accuracy, clarity, label legibility, layout and adherence \
         to the request. Score it from 0 to 10; {threshold:.1} or higher is \
         publication ready.\n\n\
         Reply in exactly this format:\n\
         SCORE: <number from 0 to 10>\n\
         VERDICT: <ACCEPT or REVISE>\n\
         CRITIQUE: <specific, actionable changes; write \"None\" if nothing needs to change>"
    )
}

/// Turns the reviewer's free-text reply into a [`ReviewResult`].
///
/// Acceptance: a parsed score decides (`score >= threshold`); without a score
/// the verdict decides; with neither the image is rejected and the whole
/// reply becomes the critique.
pub fn parse_review(reply: &str, threshold: f32) -> ReviewResult {
    let mut score = None;
    let mut verdict = None;
    let mut critique_lines: Vec<&str> = Vec::new();
    let mut other_lines: Vec<&str> = Vec::new();
    let mut in_critique = false;

    for line in reply.lines() {
        let trimmed = line.trim().trim_start_matches(['*', '#']).trim();

        if let Some(value) = strip_label(trimmed, "SCORE") {
            score = score.or_else(|| parse_score(value));
            in_critique = false;
        } else if let Some(value) = strip_label(trimmed, "VERDICT") {
            verdict = verdict.or_else(|| parse_verdict(value));
            in_critique = false;
        } else if let Some(value) = strip_label(trimmed, "CRITIQUE") {
            in_critique = true;
            if !value.is_empty() {
                critique_lines.push(value);
            }
        } else if in_critique {
            critique_lines.push(line.trim_end());
        } else {
            other_lines.push(line.trim_end());
        }
    }

    let accepted = match (score, verdict) {
        (Some(score), _) => score >= threshold,
        (None, Some(verdict)) => verdict,
        (None, None) => false,
    };

    let critique = if critique_lines.is_empty() {
        other_lines.join("\n").trim().to_string()
    } else {
        critique_lines.join("\n").trim().to_string()
    };
    let critique = if critique.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        critique
    };

    ReviewResult {
        critique,
        accepted,
        score,
    }
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = line[label.len()..].trim_start_matches('*').trim_start();
    rest.strip_prefix(':').map(|value| value.trim().trim_start_matches('*').trim())
}

fn parse_score(value: &str) -> Option<f32> {
    let (numerator, denominator) = match value.split_once('/') {
        Some((num, den)) => (num, Some(den)),
        None => (value, None),
    };

    let numerator: f32 = leading_number(numerator)?.parse().ok()?;
    let score = match denominator.and_then(leading_number) {
        Some(den) => {
            let den: f32 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            numerator * 10.0 / den
        }
        None => numerator,
    };

    score.is_finite().then(|| score.clamp(0.0, 10.0))
}

fn leading_number(text: &str) -> Option<&str> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let number = &text[..end];
    (!number.is_empty()).then_some(number)
}

fn parse_verdict(value: &str) -> Option<bool> {
    let upper = value.to_uppercase();
    if upper.starts_with("ACCEPT") {
        Some(true)
    } else if upper.starts_with("REVISE") || upper.starts_with("REJECT") {
        Some(false)
    } else {
        None
    }
}
