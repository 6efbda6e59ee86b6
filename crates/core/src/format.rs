use crate::types::Transcript;

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Render a transcript as markdown with per-segment timestamps, the shape
/// persisted alongside the raw JSON artifact.
pub fn transcript_markdown(transcript: &Transcript) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "**Language:** {} | **Duration:** {}\n\n",
        transcript.language,
        format_timestamp(transcript.duration_seconds)
    ));
    for seg in &transcript.segments {
        output.push_str(&format!(
            "[{}] {}\n",
            format_timestamp(seg.start),
            seg.text.trim()
        ));
    }
    output
}
