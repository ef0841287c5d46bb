//! Reply composition for inbound chat messages.

use tracing::{debug, error, info};

use crate::{model::Station, notify::Notifier, service::MetarService};

const GENERIC_KEYWORDS: [&str; 2] = ["metar", "weather"];

/// Lowercased keywords that trigger a report: the generic ones plus the
/// first word of the station name (e.g. "gatwick").
pub fn trigger_keywords(station: &Station) -> Vec<String> {
    let mut keywords: Vec<String> = GENERIC_KEYWORDS.iter().map(|k| k.to_string()).collect();
    if let Some(word) = station.name.split_whitespace().next() {
        let word = word.to_lowercase();
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

pub fn is_report_request(station: &Station, message: &str) -> bool {
    let message = message.trim().to_lowercase();
    trigger_keywords(station)
        .iter()
        .any(|keyword| message.contains(keyword.as_str()))
}

pub fn help_message(station: &Station) -> String {
    let keywords = trigger_keywords(station)
        .iter()
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>();
    let (last, rest) = keywords.split_last().map_or(("", &[][..]), |(l, r)| (l.as_str(), r));

    format!(
        "To get the latest {} ({}) METAR information, please send a message containing {}, or {}.",
        title_case(&station.name),
        station.code,
        rest.join(", "),
        last
    )
}

/// The text to send back for one inbound message.
pub async fn compose_reply(service: &MetarService, message: &str) -> String {
    let station = service.station();

    if !is_report_request(station, message) {
        debug!("message has no trigger keyword; replying with help");
        return help_message(station);
    }

    match service.fetch_and_format_report().await {
        Ok(report) => report,
        Err(err) => format!(
            "Sorry, there was an error retrieving the {} METAR: {}",
            first_word(&station.name),
            err
        ),
    }
}

/// Compose the reply and hand it to `notifier`. Returns the delivery result.
pub async fn handle_message(
    service: &MetarService,
    notifier: &dyn Notifier,
    from: &str,
    message: &str,
) -> bool {
    debug!(%from, %message, "received message");

    let reply = compose_reply(service, message).await;
    let delivered = notifier.send(from, &reply).await;
    if delivered {
        info!(to = %from, "reply delivered");
    } else {
        error!(to = %from, "reply could not be delivered");
    }
    delivered
}

fn first_word(name: &str) -> String {
    title_case(name.split_whitespace().next().unwrap_or(name))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
