// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use colored::*;
use kdam::{Bar, tqdm};

/// A basic progress bar for tracking iterations
pub fn progress_bar(n: usize, desc: &str, verbose: bool) -> Bar {
    if !verbose {
        return tqdm!(disable = true);
    }

    tqdm!(
        total = n,
        force_refresh = false,
        desc = progress_timestamp(desc),
        bar_format =
            "{desc suffix=' '}[{percentage:.0}%] ({rate:.1}/s, eta: {remaining human=true})"
    )
}

/// A progress message prefixed with a standardized timestamp
pub fn progress_timestamp(desc: &str) -> String {
    let time = chrono::Local::now();
    let ymd = time.format("%Y-%m-%d").to_string();
    let hms = time.format("%H:%M:%S").to_string();
    let time = format!("{} | {}", ymd, hms);

    format!(
        "{} {} {} {} {} {}",
        "[".bold(),
        time,
        "|".bold(),
        "czarr".truecolor(0, 139, 208).bold(),
        "]".bold(),
        desc,
    )
}

/// Print timestamped statements to console
pub fn progress_log(desc: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!("{}", progress_timestamp(desc));
}

/// Format numbers to readable thousands format
pub fn thousands_format<T>(number: T) -> String
where
    T: std::fmt::Display,
{
    let number = number.to_string();
    if number.len() > 4 {
        number
            .as_bytes()
            .rchunks(3)
            .rev()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<String>>()
            .join(",")
    } else {
        number
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_thousands_format() {
        assert_eq!(thousands_format(384), "384");
        assert_eq!(thousands_format(1536), "1536");
        assert_eq!(thousands_format(25000), "25,000");
        assert_eq!(thousands_format(1234567), "1,234,567");
    }

    #[test]
    fn test_progress_timestamp_contains_message() {
        let message = progress_timestamp("Processing wells");
        assert!(message.ends_with("Processing wells"));
        assert!(message.contains("czarr"));
    }
}
