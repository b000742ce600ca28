//! Minimal INI document editor for OBS settings files
//!
//! OBS writes `key=value` lines grouped under `[Section]` headers. Edits keep
//! every other line as-is (including comments and blank lines), keep key
//! case, and remember whether the file started with a UTF-8 BOM.

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Section(String),
    Entry { key: String, value: String },
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    lines: Vec<Line>,
    has_bom: bool,
}

impl IniDocument {
    /// Parse a document. Fails on an entry that appears before any section
    /// or on a line that is neither a header, entry, comment nor blank.
    pub fn parse(content: &str) -> Result<Self, String> {
        let has_bom = content.starts_with(BOM);
        let content = content.trim_start_matches(BOM);

        let mut lines = Vec::new();
        let mut in_section = false;
        for (number, raw) in content.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                lines.push(Line::Other(raw.to_string()));
            } else if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim().to_string();
                lines.push(Line::Section(name));
                in_section = true;
            } else if let Some((key, value)) = raw.split_once('=') {
                if !in_section {
                    return Err(format!("line {}: entry outside of any section", number + 1));
                }
                lines.push(Line::Entry {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                });
            } else {
                return Err(format!("line {}: unrecognized content '{}'", number + 1, trimmed));
            }
        }
        Ok(Self { lines, has_bom })
    }

    pub fn has_bom(&self) -> bool {
        self.has_bom
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let mut current = None;
        for line in &self.lines {
            match line {
                Line::Section(name) => current = Some(name.as_str()),
                Line::Entry { key: k, value } if current == Some(section) && k == key => {
                    return Some(value.as_str());
                }
                _ => {}
            }
        }
        None
    }

    /// Set `key` in `section`, creating either when missing
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let mut current: Option<&str> = None;
        let mut existing = None;
        let mut section_end = None;
        for (index, line) in self.lines.iter().enumerate() {
            match line {
                Line::Section(name) => current = Some(name.as_str()),
                Line::Entry { key: k, .. } if current == Some(section) && k == key => {
                    existing = Some(index);
                    break;
                }
                _ => {}
            }
            if current == Some(section) {
                // Insert after the last non-blank line of the section
                if !matches!(line, Line::Other(text) if text.trim().is_empty()) {
                    section_end = Some(index + 1);
                }
            }
        }

        if let Some(index) = existing {
            if let Some(Line::Entry { value: v, .. }) = self.lines.get_mut(index) {
                *v = value.to_string();
            }
            return;
        }

        let entry = Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
        };
        match section_end {
            Some(index) => self.lines.insert(index, entry),
            None => {
                if !self.lines.is_empty() {
                    self.lines.push(Line::Other(String::new()));
                }
                self.lines.push(Line::Section(section.to_string()));
                self.lines.push(entry);
            }
        }
    }

    /// Render with `key=value` lines and the original BOM
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.has_bom {
            out.push(BOM);
        }
        for line in &self.lines {
            match line {
                Line::Section(name) => {
                    out.push('[');
                    out.push_str(name);
                    out.push(']');
                }
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Other(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL_INI: &str = "\u{feff}[General]\nPre19Defaults=false\nLastVersion=503316480\n\n[OBSWebSocket]\nServerEnabled=false\nServerPort=4455\nAuthRequired=true\n\n[BasicWindow]\ngeometry=AdnQywADAAA=\n";

    #[test]
    fn test_bom_is_detected_and_preserved() {
        let doc = IniDocument::parse(GLOBAL_INI).unwrap();
        assert!(doc.has_bom());
        assert!(doc.render().starts_with('\u{feff}'));
    }

    #[test]
    fn test_set_existing_key_keeps_position() {
        let mut doc = IniDocument::parse(GLOBAL_INI).unwrap();
        doc.set("OBSWebSocket", "ServerEnabled", "true");
        let rendered = doc.render();
        assert!(rendered.contains("[OBSWebSocket]\nServerEnabled=true\nServerPort=4455"));
    }

    #[test]
    fn test_set_missing_key_appends_to_section() {
        let mut doc = IniDocument::parse(GLOBAL_INI).unwrap();
        doc.set("OBSWebSocket", "ServerPassword", "hunter22");
        let rendered = doc.render();
        assert!(rendered.contains("AuthRequired=true\nServerPassword=hunter22\n\n[BasicWindow]"));
        assert_eq!(doc.get("OBSWebSocket", "ServerPassword"), Some("hunter22"));
    }

    #[test]
    fn test_set_missing_section_appends_section() {
        let mut doc = IniDocument::parse("[General]\nName=x\n").unwrap();
        doc.set("OBSWebSocket", "ServerEnabled", "true");
        assert_eq!(
            doc.render(),
            "[General]\nName=x\n\n[OBSWebSocket]\nServerEnabled=true\n"
        );
    }

    #[test]
    fn test_set_touches_only_the_named_section() {
        let mut doc = IniDocument::parse("[A]\nKey=1\n\n[B]\nKey=2\n; note\n").unwrap();
        doc.set("B", "Key", "3");
        doc.set("A", "Other", "x");
        assert_eq!(
            doc.render(),
            "[A]\nKey=1\nOther=x\n\n[B]\nKey=3\n; note\n"
        );
    }

    #[test]
    fn test_keys_are_case_sensitive_and_preserved() {
        let doc = IniDocument::parse("[AdvOut]\nRecFilePath=C:/Videos\n").unwrap();
        assert_eq!(doc.get("AdvOut", "RecFilePath"), Some("C:/Videos"));
        assert_eq!(doc.get("AdvOut", "recfilepath"), None);
    }

    #[test]
    fn test_values_may_contain_equals() {
        let doc = IniDocument::parse("[BasicWindow]\ngeometry=AdnQ==\n").unwrap();
        assert_eq!(doc.get("BasicWindow", "geometry"), Some("AdnQ=="));
    }

    #[test]
    fn test_entry_outside_section_rejected() {
        let err = IniDocument::parse("Orphan=1\n[General]\n").unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn test_empty_document_round_trips_empty() {
        let doc = IniDocument::parse("").unwrap();
        assert_eq!(doc.render(), "");
    }
}
