use bgpkit_birdc::MaskHistogram;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::Display;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Serialize, Tabled)]
pub struct MaskRow {
    pub family: &'static str,
    pub mask: String,
    pub count: u32,
}

impl MaskRow {
    /// Flatten both histograms into rows ordered by family, then numerically by mask length.
    pub fn from_histogram(masks: &MaskHistogram) -> Vec<MaskRow> {
        [("ipv4", &masks.v4), ("ipv6", &masks.v6)]
            .into_iter()
            .flat_map(|(family, histogram)| {
                histogram
                    .iter()
                    .sorted_by_key(|(mask, _)| mask.parse::<u32>().unwrap_or(u32::MAX))
                    .map(move |(mask, count)| MaskRow {
                        family,
                        mask: mask.clone(),
                        count: *count,
                    })
            })
            .collect()
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize result: {}", e),
    }
}

/// Print a single summary struct as a one-row table or as JSON.
pub fn print_row<T: Serialize + Tabled>(value: &T, json: bool) {
    match json {
        true => print_json(value),
        false => println!("{}", Table::new([value]).with(Style::markdown())),
    }
}

pub fn print_list<T: Serialize + Display>(items: &[T], json: bool) {
    match json {
        true => print_json(&items),
        false => {
            for item in items {
                println!("{}", item);
            }
        }
    }
}

/// Print rows as a table or as a JSON array.
pub fn print_table<T: Serialize + Tabled>(items: &[T], json: bool) {
    match json {
        true => print_json(&items),
        false => println!("{}", Table::new(items).with(Style::markdown())),
    }
}

pub fn print_mask_table(rows: Vec<MaskRow>) {
    println!("{}", Table::new(rows).with(Style::markdown()));
}
