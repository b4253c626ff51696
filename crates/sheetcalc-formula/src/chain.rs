//! The calculation chain: every formula cell of a workbook in the order it
//! is calculated.
//!
//! Calculation walks the chain with a single cursor. When the formula under
//! the cursor needs a cell that is not calculated yet, that cell is moved in
//! front of the cursor and calculated first. The chain remembers the order,
//! so the next recalculation mostly runs straight through.
//!
//! Every point moved in front of the cursor is stamped. Leaving a point by
//! moving ahead clears its stamp. A point that is moved in front again while
//! its stamp is live was needed by a formula it is itself waiting for: the
//! formulas form a cycle.

use std::collections::HashMap;

use sheetcalc_core::BookPoint;
use tracing::trace;

use crate::error::{CalcError, CalcResult};

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: BookPoint,
    next: BookPoint,
    /// Step at which the point was moved in front of the cursor. Both
    /// `move_ahead` and `move_to_current` advance the step.
    stamp: Option<u64>,
}

/// Doubly linked circular list of book points with a cursor
#[derive(Debug, Default)]
pub struct CalculationChain {
    links: HashMap<BookPoint, Link>,
    head: Option<BookPoint>,
    tail: Option<BookPoint>,
    current: Option<BookPoint>,
    current_in_cycle: bool,
    target: Option<BookPoint>,
    step: u64,
}

impl CalculationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, point: BookPoint) -> bool {
        self.links.contains_key(&point)
    }

    /// Points from head to tail
    pub fn points(&self) -> Vec<BookPoint> {
        let mut points = Vec::with_capacity(self.links.len());
        let mut next = self.head;
        while let Some(point) = next {
            points.push(point);
            next = self.links.get(&point).map(|link| link.next).filter(|n| Some(*n) != self.head);
        }
        points
    }

    fn init(&mut self, point: BookPoint) {
        self.links.insert(
            point,
            Link {
                prev: point,
                next: point,
                stamp: None,
            },
        );
        self.head = Some(point);
        self.tail = Some(point);
    }

    /// Link a new point between two adjacent points. Head and tail stay.
    fn insert(&mut self, point: BookPoint, prev: BookPoint, next: BookPoint) {
        self.links.insert(
            point,
            Link {
                prev,
                next,
                stamp: None,
            },
        );
        if let Some(link) = self.links.get_mut(&prev) {
            link.next = point;
        }
        if let Some(link) = self.links.get_mut(&next) {
            link.prev = point;
        }
    }

    /// Add a point at the beginning of the chain
    pub fn add_first(&mut self, point: BookPoint) {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) => {
                self.insert(point, tail, head);
                self.head = Some(point);
            }
            _ => self.init(point),
        }
    }

    /// Append a point at the end of the chain
    pub fn add_last(&mut self, point: BookPoint) {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) => {
                self.insert(point, tail, head);
                self.tail = Some(point);
            }
            _ => self.init(point),
        }
    }

    /// Add a point right after an anchor point of the chain
    pub fn add_after(&mut self, anchor: BookPoint, point: BookPoint) -> CalcResult<()> {
        let next = self
            .links
            .get(&anchor)
            .map(|link| link.next)
            .ok_or(CalcError::PointNotInChain(anchor))?;
        self.insert(point, anchor, next);

        if self.tail == Some(anchor) {
            self.tail = Some(point);
        }
        Ok(())
    }

    pub fn remove(&mut self, point: BookPoint) -> CalcResult<()> {
        let link = self
            .links
            .remove(&point)
            .ok_or(CalcError::PointNotInChain(point))?;

        if self.links.is_empty() {
            self.head = None;
            self.tail = None;
            self.current = None;
            return Ok(());
        }

        let was_head = self.head == Some(point);
        if self.current == Some(point) {
            // Moving ahead continues with the following point
            self.current = if was_head { None } else { Some(link.prev) };
        }
        if was_head {
            self.head = Some(link.next);
        }
        if self.tail == Some(point) {
            self.tail = Some(link.prev);
        }
        if let Some(prev) = self.links.get_mut(&link.prev) {
            prev.next = link.next;
        }
        if let Some(next) = self.links.get_mut(&link.next) {
            next.prev = link.prev;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
        self.current = None;
        self.current_in_cycle = false;
        self.target = None;
    }

    /// Stop moving ahead once this point has been left behind
    pub fn set_target(&mut self, target: Option<BookPoint>) {
        self.target = target;
    }

    pub fn current(&self) -> Option<BookPoint> {
        self.current
    }

    /// Stamp left by the last move in front of the cursor, if still live
    pub fn stamp(&self, point: BookPoint) -> Option<u64> {
        self.links.get(&point).and_then(|link| link.stamp)
    }

    /// Did the current point become current again while it was waiting for
    /// other points?
    pub fn is_current_in_cycle(&self) -> bool {
        self.current_in_cycle
    }

    /// Leave the current point and move to the next one. The first call
    /// moves to the head. Returns false when the target was reached or the
    /// whole chain was walked.
    pub fn move_ahead(&mut self) -> bool {
        self.step += 1;
        self.current_in_cycle = false;

        let Some(current) = self.current else {
            self.current = self.head;
            return self.current.is_some();
        };

        if self.target == Some(current) {
            return false;
        }

        let Some(link) = self.links.get_mut(&current) else {
            return false;
        };
        link.stamp = None;
        let next = link.next;

        if Some(next) == self.head {
            return false;
        }
        self.current = Some(next);
        true
    }

    /// Make `point` the current point by moving it right before the current
    /// one. Sets the cycle flag when the point was already moved in front and
    /// has not been left since.
    pub fn move_to_current(&mut self, point: BookPoint) -> CalcResult<()> {
        let current = self.current.ok_or(CalcError::PointNotInChain(point))?;
        let stamp = self
            .links
            .get(&point)
            .map(|link| link.stamp)
            .ok_or(CalcError::PointNotInChain(point))?;

        if current != point {
            self.remove(point)?;
            if self.head == Some(current) {
                self.add_first(point);
            } else {
                let anchor = self
                    .links
                    .get(&current)
                    .map(|link| link.prev)
                    .ok_or(CalcError::PointNotInChain(current))?;
                self.add_after(anchor, point)?;
            }
            trace!(%point, before = %current, "moved point in front of current");
        }

        self.step += 1;
        if let Some(link) = self.links.get_mut(&point) {
            link.stamp = Some(self.step);
        }
        self.current = Some(point);
        self.current_in_cycle = stamp.is_some();
        Ok(())
    }

    /// Forget the cursor, the target and all stamps. Points behind the
    /// cursor have no live stamp, so this clears the ones ahead of it and
    /// also works in the middle of a walk.
    pub fn reset(&mut self) {
        for link in self.links.values_mut() {
            link.stamp = None;
        }
        self.current = None;
        self.current_in_cycle = false;
        self.target = None;
    }
}
