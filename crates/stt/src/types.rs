use serde::{Deserialize, Serialize};

/// Word with its timing inside a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,

    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,
}

/// Single transcription segment with timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position of the segment in the transcript, from 0
    pub id: usize,

    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,

    /// Transcribed text
    pub text: String,

    /// Word timings, omitted from JSON when unavailable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
}

impl Segment {
    /// Create a new segment without word timings
    pub fn new(id: usize, start: f32, end: f32, text: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
            words: Vec::new(),
        }
    }

    /// Attach word timings
    pub fn with_words(mut self, words: Vec<Word>) -> Self {
        self.words = words;
        self
    }
}

/// Complete transcription result
///
/// Serializes to the transcript JSON document stored alongside the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Length of the decoded audio in seconds
    pub duration: f32,

    /// Detected or configured language (ISO code)
    pub language: String,

    /// Individual segments with timestamps
    pub segments: Vec<Segment>,
}

impl Transcription {
    /// Create a new transcription
    pub fn new(duration: f32, language: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            duration,
            language: language.into(),
            segments,
        }
    }

    /// Plain-text rendering: one trimmed segment per line
    pub fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(|seg| seg.text.trim())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Transcription options
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    /// Language hint (e.g., "en"); `None` auto-detects
    pub language: Option<String>,

    /// Beam width for beam search decoding
    pub beam_size: i32,

    /// Collect per-word timings
    pub word_timestamps: bool,

    /// Inference threads
    pub threads: i32,

    /// Drop segments that are a single word looped over and over
    pub suppress_repetitions: bool,

    /// No speech threshold
    pub no_speech_threshold: f32,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get().min(8) as i32)
            .unwrap_or(4);

        Self {
            language: None,
            beam_size: 5,
            word_timestamps: true,
            threads,
            suppress_repetitions: true,
            no_speech_threshold: 0.6,
        }
    }
}

impl TranscriptionOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set language
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_creation() {
        let seg = Segment::new(0, 0.0, 5.5, "Hello world");
        assert_eq!(seg.end - seg.start, 5.5);
        assert!(seg.words.is_empty());
    }

    #[test]
    fn test_to_text_trims_each_segment() {
        let transcription = Transcription::new(
            5.0,
            "en",
            vec![
                Segment::new(0, 0.0, 2.0, " First segment "),
                Segment::new(1, 2.0, 5.0, " Second segment"),
            ],
        );

        assert_eq!(transcription.to_text(), "First segment\nSecond segment");
    }

    #[test]
    fn test_json_shape() {
        let words = vec![Word {
            word: "Hi".to_string(),
            start: 0.0,
            end: 0.5,
        }];
        let transcription = Transcription::new(
            1.5,
            "en",
            vec![
                Segment::new(0, 0.0, 0.5, "Hi").with_words(words),
                Segment::new(1, 0.5, 1.5, "there"),
            ],
        );

        let json = serde_json::to_value(&transcription).unwrap();
        assert_eq!(json["duration"], 1.5);
        assert_eq!(json["language"], "en");
        assert_eq!(json["segments"][0]["id"], 0);
        assert_eq!(json["segments"][0]["words"][0]["word"], "Hi");
        // No word timings -> key omitted
        assert!(json["segments"][1].get("words").is_none());
    }

    #[test]
    fn test_default_options() {
        let options = TranscriptionOptions::default();
        assert_eq!(options.beam_size, 5);
        assert!(options.word_timestamps);
        assert!(options.language.is_none());
        assert!(options.threads >= 1);
    }
}
