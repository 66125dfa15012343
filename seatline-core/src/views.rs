//! Read models derived from a show snapshot. Pure: no I/O, no mutation.
//!
//! Holds that have already expired relative to `now` are treated as absent,
//! so the views stay correct even on a snapshot that has not been evicted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::show::{SeatNumber, Show};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub show_id: Uuid,
    pub show_name: String,
    pub total_seats: i32,
    pub available_seats: usize,
    pub held_seats: usize,
    pub booked_seats: usize,
    pub booked_seat_numbers: Vec<SeatNumber>,
    pub held_seat_numbers: Vec<SeatNumber>,
}

impl Availability {
    pub fn of(show: &Show, now: DateTime<Utc>) -> Self {
        let held_seat_numbers = show.active_held_seat_numbers(now);
        Self {
            show_id: show.id,
            show_name: show.name.clone(),
            total_seats: show.total_seats,
            available_seats: show.available_count(now),
            held_seats: held_seat_numbers.len(),
            booked_seats: show.booked_seats.len(),
            booked_seat_numbers: show.booked_seats.clone(),
            held_seat_numbers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatList {
    pub count: usize,
    pub seat_numbers: Vec<SeatNumber>,
}

impl SeatList {
    fn new(seat_numbers: Vec<SeatNumber>) -> Self {
        Self {
            count: seat_numbers.len(),
            seat_numbers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldSeatDetail {
    pub seat_number: SeatNumber,
    pub expires_at: DateTime<Utc>,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldSummary {
    pub count: usize,
    pub details: Vec<HeldSeatDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowStats {
    pub show_id: Uuid,
    pub show_name: String,
    pub total_seats: i32,
    pub available_seats: SeatList,
    pub held_seats: HeldSummary,
    pub booked_seats: SeatList,
}

impl ShowStats {
    pub fn of(show: &Show, now: DateTime<Utc>) -> Self {
        let details: Vec<HeldSeatDetail> = show
            .active_holds(now)
            .map(|hold| HeldSeatDetail {
                seat_number: hold.seat_number,
                expires_at: hold.expires_at,
                expires_in_seconds: (hold.expires_at - now).num_seconds().max(0),
            })
            .collect();

        Self {
            show_id: show.id,
            show_name: show.name.clone(),
            total_seats: show.total_seats,
            available_seats: SeatList::new(available_seat_numbers(show, now)),
            held_seats: HeldSummary {
                count: details.len(),
                details,
            },
            booked_seats: SeatList::new(show.booked_seats.clone()),
        }
    }
}

/// Every seat in `[1, total_seats]` that is neither booked nor actively held.
pub fn available_seat_numbers(show: &Show, now: DateTime<Utc>) -> Vec<SeatNumber> {
    let booked = show.booked_index();
    let held: HashSet<SeatNumber> = show.active_holds(now).map(|hold| hold.seat_number).collect();

    (1..=SeatNumber::from(show.total_seats))
        .filter(|seat| !booked.contains(seat) && !held.contains(seat))
        .collect()
}
