//! Parsers for cleaned command output

use std::net::Ipv4Addr;

use crate::error::{AtError, AtResult};
use crate::timing::SIGNAL_MAX;
use crate::{BatteryStatus, NetworkEntry, Registration};

/// AT+CSQ value meaning "not known or not detectable"
const SIGNAL_UNKNOWN: u8 = 99;

/// `+CPIN: READY` means no PIN is pending
pub fn sim_ready(output: &str) -> bool {
    output == "+CPIN: READY"
}

/// Parse the bearer IP address from `+SAPBR: 1,1,"10.0.0.1"`
///
/// Returns `None` when the bearer has no address (`0.0.0.0`).
pub fn ip_address(output: &str) -> AtResult<Option<Ipv4Addr>> {
    // Leftovers from earlier traffic may precede the +SAPBR line
    let response = output.rsplit('+').next().unwrap_or(output);

    let pieces: Vec<&str> = response.split(',').collect();
    if pieces.len() != 3 {
        return Err(AtError::parse("IP address", output));
    }

    let addr: Ipv4Addr = pieces[2]
        .trim()
        .replace('"', "")
        .parse()
        .map_err(|_| AtError::parse("IP address", output))?;

    if addr.is_unspecified() {
        return Ok(None);
    }
    Ok(Some(addr))
}

/// Signal quality from `+CSQ: <rssi>,<ber>` as a ratio in [0, 1]
pub fn signal_strength(output: &str) -> AtResult<f64> {
    let rssi: u8 = output
        .split(':')
        .nth(1)
        .and_then(|fields| fields.split(',').next())
        .and_then(|rssi| rssi.trim().parse().ok())
        .ok_or_else(|| AtError::parse("signal quality", output))?;

    if rssi == SIGNAL_UNKNOWN {
        return Ok(0.0);
    }

    Ok((f64::from(rssi) / f64::from(SIGNAL_MAX)).min(1.0))
}

/// Operators from `+COPS: (2,"Name","Short","20801"),(...),,(0-4),(0-2)`
///
/// Tuples that do not have exactly four fields with quoted names are skipped.
pub fn networks(output: &str) -> AtResult<Vec<NetworkEntry>> {
    let (_, tuples) = output
        .split_once('(')
        .ok_or_else(|| AtError::parse("network list", output))?;

    let entries = tuples
        .split(')')
        .filter_map(|piece| {
            let piece = piece.replace(",(", "");
            let fields: Vec<&str> = piece.split(',').collect();
            if fields.len() != 4 {
                return None;
            }
            Some(NetworkEntry {
                name: unquote(fields[1])?.to_string(),
                short_name: unquote(fields[2])?.to_string(),
                id: unquote(fields[3])?.to_string(),
            })
        })
        .collect();

    Ok(entries)
}

fn unquote(field: &str) -> Option<&str> {
    field.trim().strip_prefix('"')?.strip_suffix('"')
}

/// Operator name from `+COPS: 0,0,"Orange F"`, `None` when not registered
pub fn current_network(output: &str) -> Option<String> {
    let last = output.rsplit(',').next().unwrap_or(output);
    let network = last.strip_prefix('"').unwrap_or(last);
    let network = network.strip_suffix('"').unwrap_or(network);

    // Nothing was stripped: the response only holds the mode
    if network.starts_with("+COPS") {
        return None;
    }
    Some(network.to_string())
}

/// Status code from `+HTTPACTION: <method>,<status>,<length>`
pub fn http_status(output: &str) -> AtResult<u16> {
    output
        .split(',')
        .nth(1)
        .and_then(|status| status.trim().parse().ok())
        .ok_or_else(|| AtError::parse("HTTP status", output))
}

/// Battery reading from `+CBC: <bcs>,<bcl>,<voltage>`
pub fn battery(output: &str) -> AtResult<BatteryStatus> {
    let invalid = || AtError::parse("battery status", output);

    let fields: Vec<&str> = output
        .split_once(':')
        .ok_or_else(invalid)?
        .1
        .split(',')
        .map(str::trim)
        .collect();
    if fields.len() != 3 {
        return Err(invalid());
    }

    let state: u8 = fields[0].parse().map_err(|_| invalid())?;
    Ok(BatteryStatus {
        charging: state == 1,
        percent: fields[1].parse().map_err(|_| invalid())?,
        millivolts: fields[2].parse().map_err(|_| invalid())?,
    })
}

/// Registration state from `+CREG: <n>,<stat>`
pub fn registration(output: &str) -> AtResult<Registration> {
    let stat = output
        .lines()
        .find_map(|line| line.strip_prefix("+CREG:"))
        .and_then(|fields| fields.split(',').nth(1))
        .and_then(|stat| stat.trim().parse::<u8>().ok())
        .ok_or_else(|| AtError::parse("registration status", output))?;

    Ok(match stat {
        0 => Registration::NotRegistered,
        1 => Registration::Home,
        2 => Registration::Searching,
        3 => Registration::Denied,
        5 => Registration::Roaming,
        _ => Registration::Unknown,
    })
}

/// Whether `AT+CIPSSL=?` advertises SSL support
pub fn ssl_supported(output: &str) -> bool {
    output == "+CIPSSL: (0-1)"
}
