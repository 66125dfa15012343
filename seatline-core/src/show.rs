use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::ReservationError;

/// Wide enough that any JSON integer a client sends can be judged against
/// the seat range rather than rejected during parsing.
pub type SeatNumber = i64;

/// Hold duration applied when a request does not name one.
pub const DEFAULT_HOLD_MINUTES: i64 = 5;

/// A temporary claim on one seat. Lives only inside its show's hold index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldSeat {
    pub seat_number: SeatNumber,
    pub expires_at: DateTime<Utc>,
}

impl HeldSeat {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// One event with a fixed seat inventory.
///
/// The show is the unit of concurrency control: holds and bookings have no
/// identity outside it, and every change to them is committed by saving the
/// whole aggregate against its `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: Uuid,
    pub name: String,
    pub total_seats: i32,
    /// Seats permanently assigned, in booking order. Never shrinks.
    pub booked_seats: Vec<SeatNumber>,
    /// Seat number -> hold. Serialized as `[{seatNumber, expiresAt}]`.
    #[serde(with = "held_index")]
    pub held_seats: BTreeMap<SeatNumber, HeldSeat>,
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Show {
    pub fn new(name: impl Into<String>, total_seats: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_seats,
            booked_seats: Vec::new(),
            held_seats: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains_seat(&self, seat: SeatNumber) -> bool {
        (1..=SeatNumber::from(self.total_seats)).contains(&seat)
    }

    pub fn is_booked(&self, seat: SeatNumber) -> bool {
        self.booked_seats.contains(&seat)
    }

    /// Lookup index over `booked_seats` for checks that touch many seats.
    pub fn booked_index(&self) -> HashSet<SeatNumber> {
        self.booked_seats.iter().copied().collect()
    }

    pub fn is_actively_held(&self, seat: SeatNumber, now: DateTime<Utc>) -> bool {
        self.held_seats
            .get(&seat)
            .is_some_and(|hold| !hold.is_expired(now))
    }

    /// In range, not booked and not under an unexpired hold.
    pub fn is_seat_free(&self, seat: SeatNumber, now: DateTime<Utc>) -> bool {
        self.contains_seat(seat) && !self.is_booked(seat) && !self.is_actively_held(seat, now)
    }

    fn is_seat_free_in(
        &self,
        seat: SeatNumber,
        booked: &HashSet<SeatNumber>,
        now: DateTime<Utc>,
    ) -> bool {
        self.contains_seat(seat) && !booked.contains(&seat) && !self.is_actively_held(seat, now)
    }

    pub fn active_hold_count(&self, now: DateTime<Utc>) -> usize {
        self.active_holds(now).count()
    }

    /// Seats neither booked nor actively held. Booked and held seats are
    /// disjoint and in range, so this is a subtraction.
    pub fn available_count(&self, now: DateTime<Utc>) -> usize {
        let total = usize::try_from(self.total_seats).unwrap_or(0);
        total
            .saturating_sub(self.booked_seats.len())
            .saturating_sub(self.active_hold_count(now))
    }

    pub fn active_holds(&self, now: DateTime<Utc>) -> impl Iterator<Item = &HeldSeat> + '_ {
        self.held_seats.values().filter(move |hold| !hold.is_expired(now))
    }

    pub fn active_held_seat_numbers(&self, now: DateTime<Utc>) -> Vec<SeatNumber> {
        self.active_holds(now).map(|hold| hold.seat_number).collect()
    }

    /// Drops every hold with `expires_at <= now` and returns the released seats.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> Vec<SeatNumber> {
        let expired: Vec<SeatNumber> = self
            .held_seats
            .values()
            .filter(|hold| hold.is_expired(now))
            .map(|hold| hold.seat_number)
            .collect();

        for seat in &expired {
            self.held_seats.remove(seat);
        }

        expired
    }

    /// Places one hold per seat, all expiring at `expires_at`.
    ///
    /// All-or-nothing: if any seat is out of range, booked or actively held,
    /// the show is left untouched.
    pub fn hold_seats(
        &mut self,
        seats: &[SeatNumber],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if seats.is_empty() {
            return Err(ReservationError::InvalidRequest(
                "seatNumbers array is required".to_string(),
            ));
        }

        let booked = self.booked_index();
        let unavailable: Vec<SeatNumber> = seats
            .iter()
            .copied()
            .filter(|seat| !self.is_seat_free_in(*seat, &booked, now))
            .collect();

        if !unavailable.is_empty() {
            return Err(ReservationError::SeatUnavailable {
                requested: seats.to_vec(),
                unavailable,
            });
        }

        for &seat_number in seats {
            self.held_seats.insert(
                seat_number,
                HeldSeat {
                    seat_number,
                    expires_at,
                },
            );
        }

        Ok(())
    }

    /// Converts active holds into permanent bookings.
    ///
    /// Every seat must currently be held; whose hold it is does not matter.
    pub fn book_seats(
        &mut self,
        seats: &[SeatNumber],
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if seats.is_empty() {
            return Err(ReservationError::InvalidRequest(
                "seatNumbers array is required".to_string(),
            ));
        }

        let not_held: Vec<SeatNumber> = seats
            .iter()
            .copied()
            .filter(|seat| !self.is_actively_held(*seat, now))
            .collect();

        if !not_held.is_empty() {
            return Err(ReservationError::SeatNotHeld {
                requested: seats.to_vec(),
                not_held,
                held: self.active_held_seat_numbers(now),
            });
        }

        let mut booked = self.booked_index();
        for &seat in seats {
            self.held_seats.remove(&seat);
            if booked.insert(seat) {
                self.booked_seats.push(seat);
            }
        }

        Ok(())
    }
}

/// Collapses repeated seat numbers, keeping first-occurrence order.
pub fn dedup_seats(seats: &[SeatNumber]) -> Vec<SeatNumber> {
    let mut seen = HashSet::with_capacity(seats.len());
    seats.iter().copied().filter(|seat| seen.insert(*seat)).collect()
}

mod held_index {
    use super::{HeldSeat, SeatNumber};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(index: &BTreeMap<SeatNumber, HeldSeat>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let holds: Vec<&HeldSeat> = index.values().collect();
        holds.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<SeatNumber, HeldSeat>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let holds = Vec::<HeldSeat>::deserialize(deserializer)?;
        Ok(holds
            .into_iter()
            .map(|hold| (hold.seat_number, hold))
            .collect())
    }
}
