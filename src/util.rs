// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::path::Path;
use std::time::Duration;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Outputs the given duration as seconds with millisecond precision, e.g. `1.200s`.
pub fn duration_seconds(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use std::time::Duration;

    use crate::util::{duration_seconds, filename_display};

    #[test]
    fn test_filename_display() {
        assert_eq!("ape.mp3", filename_display(Path::new("audio_files/ape.mp3")));
        assert_eq!("biip.mp3", filename_display(Path::new("biip.mp3")));
        assert_eq!("unreadable file name", filename_display(Path::new("/")));
    }

    #[test]
    fn test_duration_seconds() {
        assert_eq!("0.000s", duration_seconds(Duration::ZERO));
        assert_eq!("0.400s", duration_seconds(Duration::from_millis(400)));
        assert_eq!("1.200s", duration_seconds(Duration::from_millis(1200)));
    }
}
