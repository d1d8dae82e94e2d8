//! Pointer (cursor) register of the logic card.
//!
//! Cell and I/O field commands (`CCA`, `CCB`) carry no address: they act on
//! whatever sub-register the card's pointer currently selects. Every field
//! access therefore moves the pointer first. The register caches the last
//! position it moved to so that consecutive accesses to the same cell cost a
//! single bus round trip.
//!
//! The cache is local to one driver instance. Two instances addressing the same
//! card without coordination will desynchronize; that is the caller's problem.

use crate::adapters::Transport;
use crate::error::{PlogicError, PlogicResult};
use crate::hardware::codes::NUM_ADDRESSES;
use crate::hardware::protocol::{parse_after_token, CardLink, ACK};
use tracing::trace;

/// Cached view of the hardware pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    /// No move or read-back has happened since construction.
    Unknown,
    /// The pointer was last seen at this address.
    PositionedAt(u8),
}

/// Outcome of [`PointerRegister::move_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// The cache already matched; nothing was sent.
    CacheHit,
    /// A move command was issued and acknowledged.
    Moved,
}

/// Pointer register of one axis.
#[derive(Debug)]
pub struct PointerRegister {
    axis: char,
    state: PointerState,
}

impl PointerRegister {
    /// New register for `axis`, in the [`PointerState::Unknown`] state.
    pub fn new(axis: char) -> Self {
        Self {
            axis,
            state: PointerState::Unknown,
        }
    }

    /// Current cached state.
    pub fn state(&self) -> PointerState {
        self.state
    }

    /// Cached position, if known.
    pub fn position(&self) -> Option<u8> {
        match self.state {
            PointerState::PositionedAt(address) => Some(address),
            PointerState::Unknown => None,
        }
    }

    /// Move the pointer to `address` unless it is already there.
    pub fn move_to<T: Transport>(
        &mut self,
        link: &mut CardLink<T>,
        address: u8,
    ) -> PlogicResult<Move> {
        if self.state == PointerState::PositionedAt(address) {
            trace!(axis = %self.axis, address, "pointer already positioned");
            return Ok(Move::CacheHit);
        }
        self.force_move(link, address)?;
        Ok(Move::Moved)
    }

    /// Issue the move command even if the cache says it is not needed.
    pub fn force_move<T: Transport>(
        &mut self,
        link: &mut CardLink<T>,
        address: u8,
    ) -> PlogicResult<()> {
        if address == 0 || address >= NUM_ADDRESSES {
            return Err(PlogicError::invalid_value("pointer position", address));
        }
        link.query_verify(&format!("M {}={}", self.axis, address), ACK)?;
        self.state = PointerState::PositionedAt(address);
        Ok(())
    }

    /// Read the hardware pointer and resynchronize the cache with it.
    pub fn refresh_from_hardware<T: Transport>(
        &mut self,
        link: &mut CardLink<T>,
    ) -> PlogicResult<u8> {
        let reply = link.query_verify(&format!("W {}", self.axis), ACK)?;
        let raw = parse_after_token(&reply, ACK)?;
        let address = u8::try_from(raw)
            .ok()
            .filter(|address| *address < NUM_ADDRESSES)
            .ok_or_else(|| PlogicError::invalid_value("pointer position", raw))?;
        self.state = PointerState::PositionedAt(address);
        Ok(address)
    }

    /// Forget the cached position, e.g. after another party may have moved it.
    pub fn invalidate(&mut self) {
        self.state = PointerState::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SimulatedCard;

    fn link() -> CardLink<SimulatedCard> {
        CardLink::new(SimulatedCard::new('1', 'M'), '1')
    }

    #[test]
    fn starts_unknown() {
        let pointer = PointerRegister::new('M');
        assert_eq!(pointer.state(), PointerState::Unknown);
        assert_eq!(pointer.position(), None);
    }

    #[test]
    fn second_move_to_same_address_is_a_cache_hit() {
        let mut link = link();
        let mut pointer = PointerRegister::new('M');

        assert_eq!(pointer.move_to(&mut link, 5).unwrap(), Move::Moved);
        assert_eq!(pointer.move_to(&mut link, 5).unwrap(), Move::CacheHit);

        assert_eq!(link.transport().command_log(), vec!["M M=5"]);
        assert_eq!(pointer.state(), PointerState::PositionedAt(5));
    }

    #[test]
    fn failed_move_keeps_previous_state() {
        let mut link = link();
        let mut pointer = PointerRegister::new('M');
        pointer.move_to(&mut link, 3).unwrap();

        link.transport_mut().force_reply("M M=4", ":N-1");
        assert!(pointer.move_to(&mut link, 4).is_err());
        assert_eq!(pointer.position(), Some(3));
    }

    #[test]
    fn refresh_reads_hardware_position() {
        let mut link = link();
        link.transport_mut().set_pointer(17);
        let mut pointer = PointerRegister::new('M');

        assert_eq!(pointer.refresh_from_hardware(&mut link).unwrap(), 17);
        assert_eq!(pointer.state(), PointerState::PositionedAt(17));
        assert_eq!(link.transport().command_log(), vec!["W M"]);
    }

    #[test]
    fn out_of_range_moves_are_rejected_without_bus_traffic() {
        let mut link = link();
        let mut pointer = PointerRegister::new('M');

        assert!(matches!(
            pointer.move_to(&mut link, 128),
            Err(PlogicError::InvalidValue { .. })
        ));
        assert!(pointer.move_to(&mut link, 0).is_err());
        assert!(link.transport().command_log().is_empty());
    }

    #[test]
    fn invalidated_pointer_moves_again() {
        let mut link = link();
        let mut pointer = PointerRegister::new('M');
        pointer.move_to(&mut link, 9).unwrap();

        pointer.invalidate();
        assert_eq!(pointer.state(), PointerState::Unknown);
        assert_eq!(pointer.move_to(&mut link, 9).unwrap(), Move::Moved);
        assert_eq!(link.transport().command_log(), vec!["M M=9", "M M=9"]);
    }
}
