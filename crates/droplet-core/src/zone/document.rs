//! Line-oriented zone file model
//!
//! Only two kinds of lines are understood: the SOA serial line
//! (`<10 digits> ; serial`) and the A record of the managed hostname
//! (`<name> IN A <ipv4>`). Every other line is kept verbatim, including its
//! line ending, so rendering an unmodified document reproduces the input
//! byte for byte.

use chrono::NaiveDate;
use regex::Regex;
use std::net::Ipv4Addr;

use super::serial::ZoneSerial;
use crate::error::{Error, Result};

const SERIAL_PATTERN: &str = r"^\s*(\d{10})\s*;\s*serial";

/// One line of a zone file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneLine {
    /// SOA serial line; `prefix` and `suffix` surround the digits
    Serial {
        prefix: String,
        serial: ZoneSerial,
        suffix: String,
    },
    /// A record of the managed hostname
    ARecord {
        /// Line as read (without line ending)
        raw: String,
        /// Address text as found in the file
        address: String,
        /// Line ending ("\n", "\r\n" or "" on an unterminated last line)
        ending: String,
        /// Whether `address` was replaced
        rewritten: bool,
    },
    /// Anything else, including its line ending
    Other(String),
}

/// Result of pointing the managed A record at an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressChange {
    /// At least one record line was rewritten
    Changed {
        /// Address found on the first rewritten line
        previous: String,
    },
    /// Every record line already had the address
    Unchanged,
    /// The file has no A record line for the hostname
    Missing,
}

/// Parsed zone file
#[derive(Debug, Clone)]
pub struct ZoneDocument {
    record_name: String,
    lines: Vec<ZoneLine>,
}

impl ZoneDocument {
    /// Parse zone file text, classifying lines for `record_name`
    pub fn parse(text: &str, record_name: &str) -> Result<Self> {
        let serial_re = Regex::new(SERIAL_PATTERN)
            .map_err(|e| Error::config(format!("Invalid serial pattern: {e}")))?;
        let a_re = Regex::new(&format!(
            r"^\s*{}\s+IN\s+A\s+(\d+\.\d+\.\d+\.\d+)\s*$",
            regex::escape(record_name)
        ))
        .map_err(|e| Error::config(format!("Invalid record name '{record_name}': {e}")))?;

        let lines = text
            .split_inclusive('\n')
            .map(|chunk| classify(chunk, &serial_re, &a_re))
            .collect();

        Ok(Self {
            record_name: record_name.to_string(),
            lines,
        })
    }

    pub fn lines(&self) -> &[ZoneLine] {
        &self.lines
    }

    /// First serial in the file
    pub fn serial(&self) -> Option<ZoneSerial> {
        self.lines.iter().find_map(|line| match line {
            ZoneLine::Serial { serial, .. } => Some(*serial),
            _ => None,
        })
    }

    /// Addresses of all A record lines for the managed hostname
    pub fn addresses(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                ZoneLine::ARecord { address, .. } => Some(address.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Advance every serial line for a change made on `today`
    ///
    /// Returns `(old, new)` of the first serial line, or `None` if the file
    /// has no serial line.
    pub fn bump_serial(&mut self, today: NaiveDate) -> Option<(ZoneSerial, ZoneSerial)> {
        let mut first = None;
        for line in &mut self.lines {
            if let ZoneLine::Serial { serial, .. } = line {
                let old = *serial;
                *serial = old.next(today);
                first.get_or_insert((old, *serial));
            }
        }
        first
    }

    /// Point the managed A record at `target`
    pub fn set_address(&mut self, target: Ipv4Addr) -> AddressChange {
        let target = target.to_string();
        let mut seen = false;
        let mut previous = None;

        for line in &mut self.lines {
            if let ZoneLine::ARecord {
                address, rewritten, ..
            } = line
            {
                seen = true;
                if *address != target {
                    previous.get_or_insert_with(|| address.clone());
                    *address = target.clone();
                    *rewritten = true;
                }
            }
        }

        match (seen, previous) {
            (false, _) => AddressChange::Missing,
            (true, None) => AddressChange::Unchanged,
            (true, Some(previous)) => AddressChange::Changed { previous },
        }
    }

    /// Serialize back to zone file text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                ZoneLine::Serial {
                    prefix,
                    serial,
                    suffix,
                } => {
                    out.push_str(prefix);
                    out.push_str(&serial.to_string());
                    out.push_str(suffix);
                }
                ZoneLine::ARecord {
                    raw,
                    address,
                    ending,
                    rewritten,
                } => {
                    if *rewritten {
                        out.push_str(&format!("{}\tIN\tA\t{}", self.record_name, address));
                    } else {
                        out.push_str(raw);
                    }
                    out.push_str(ending);
                }
                ZoneLine::Other(raw) => out.push_str(raw),
            }
        }
        out
    }
}

fn classify(chunk: &str, serial_re: &Regex, a_re: &Regex) -> ZoneLine {
    if let Some(caps) = serial_re.captures(chunk)
        && let Some(digits) = caps.get(1)
        && let Some(serial) = ZoneSerial::parse(digits.as_str())
    {
        return ZoneLine::Serial {
            prefix: chunk[..digits.start()].to_string(),
            serial,
            suffix: chunk[digits.end()..].to_string(),
        };
    }

    let body = chunk
        .strip_suffix('\n')
        .map(|b| b.strip_suffix('\r').unwrap_or(b))
        .unwrap_or(chunk);

    if let Some(caps) = a_re.captures(body)
        && let Some(address) = caps.get(1)
    {
        return ZoneLine::ARecord {
            raw: body.to_string(),
            address: address.as_str().to_string(),
            ending: chunk[body.len()..].to_string(),
            rewritten: false,
        };
    }

    ZoneLine::Other(chunk.to_string())
}
