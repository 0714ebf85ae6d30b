/// Instruction prompt sent alongside the timetable image.
///
/// Defines the visual grammar of the printed timetable and the JSON shape the
/// normalizer expects. Keep the target shape in sync with `rollcall-timetable`.
pub const TIMETABLE_PROMPT: &str = r#"You are a strict data extraction engine analyzing a photographed university class timetable.

Layout:
- Rows are weekdays (Mon, Tue, Wed, Thu, Fri).
- Columns are periods (usually 1 to 7); the header row gives each period's start and end time.
- Each cell holds three lines:
  1. Subject code (top line, e.g. "CS101")
  2. Teacher / faculty (middle line, e.g. "Dr. A")
  3. Room (bottom line, e.g. "TG-202")

Rules:
1. Merged cells: if a class spans several periods (e.g. 11:00 to 13:00), output ONE entry with the true start and end time.
2. Empty cells: skip them.
3. Times are 24-hour "HH:MM".
4. Output ONLY a JSON object. No markdown, no commentary.

Target JSON:
{
  "timeTable": {
    "Monday": [
      { "subject": "String", "room": "String", "teacher": "String", "startTime": "HH:MM", "endTime": "HH:MM" }
    ],
    "Tuesday": [],
    "Wednesday": [],
    "Thursday": [],
    "Friday": []
  }
}"#;

/// Remove Markdown code fences the model wraps around otherwise-valid JSON.
///
/// Drops every ```` ```json ```` / ```` ``` ```` marker and trims surrounding
/// whitespace. Text without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}
