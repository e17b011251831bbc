//! Editable instruction sequence with stable identities.

use crate::Vec;
use crate::error::IntegrityError;

use super::{InstrId, Instruction};

/// An ordered, editable sequence of instructions.
///
/// Every instruction gets an [`InstrId`] when it enters the stream. Jumps
/// name their targets by id, so inserting or removing other instructions
/// never disturbs them. Removal refuses to orphan a jump: an instruction that
/// other jumps target can only be removed by redirecting those jumps first
/// (see [`InstructionStream::remove_redirect`]).
#[derive(Clone, Debug, Default)]
pub struct InstructionStream {
    /// Storage indexed by id; removed instructions leave a `None` behind.
    slots: Vec<Option<Instruction>>,
    /// Program order.
    order: Vec<InstrId>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in program order.
    pub fn ids(&self) -> &[InstrId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> + '_ {
        self.order.iter().filter_map(|&id| self.get(id).map(|i| (id, i)))
    }

    pub fn contains(&self, id: InstrId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.slots.get(id.slot()).and_then(Option::as_ref)
    }

    /// Mutable access to an instruction.
    ///
    /// Operands changed through this reference are not checked against the
    /// stream; the encoder reports jumps left pointing at removed
    /// instructions.
    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        self.slots.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// The instruction at program position `index`.
    pub fn at(&self, index: usize) -> Option<(InstrId, &Instruction)> {
        let id = *self.order.get(index)?;
        self.get(id).map(|i| (id, i))
    }

    pub fn first(&self) -> Option<InstrId> {
        self.order.first().copied()
    }

    pub fn last(&self) -> Option<InstrId> {
        self.order.last().copied()
    }

    /// Current program position of `id`.
    pub fn index_of(&self, id: InstrId) -> Option<usize> {
        self.order.iter().position(|&x| x == id)
    }

    /// Appends `instruction` at the end.
    pub fn push(&mut self, instruction: Instruction) -> Result<InstrId, IntegrityError> {
        let position = self.order.len();
        self.insert_at(position, instruction)
    }

    pub fn insert_before(
        &mut self,
        anchor: InstrId,
        instruction: Instruction,
    ) -> Result<InstrId, IntegrityError> {
        let position = self
            .index_of(anchor)
            .ok_or(IntegrityError::UnknownInstruction(anchor))?;
        self.insert_at(position, instruction)
    }

    pub fn insert_after(
        &mut self,
        anchor: InstrId,
        instruction: Instruction,
    ) -> Result<InstrId, IntegrityError> {
        let position = self
            .index_of(anchor)
            .ok_or(IntegrityError::UnknownInstruction(anchor))?;
        self.insert_at(position + 1, instruction)
    }

    fn insert_at(
        &mut self,
        position: usize,
        instruction: Instruction,
    ) -> Result<InstrId, IntegrityError> {
        let id = self.next_id();
        self.check_target(&instruction, Some(id))?;
        self.slots.push(Some(instruction));
        self.order.insert(position, id);
        Ok(id)
    }

    /// Swaps the instruction stored under `id`, keeping its identity and
    /// position. Jumps that target `id` keep targeting it.
    pub fn replace(
        &mut self,
        id: InstrId,
        instruction: Instruction,
    ) -> Result<Instruction, IntegrityError> {
        if !self.contains(id) {
            return Err(IntegrityError::UnknownInstruction(id));
        }
        self.check_target(&instruction, None)?;
        let slot = self
            .slots
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(IntegrityError::UnknownInstruction(id))?;
        Ok(core::mem::replace(slot, instruction))
    }

    /// Ids of the jumps whose target is `id`, in program order.
    pub fn targeting(&self, id: InstrId) -> Vec<InstrId> {
        self.iter()
            .filter(|(_, instr)| instr.jump_target() == Some(id))
            .map(|(from, _)| from)
            .collect()
    }

    /// Removes `id` from the stream.
    ///
    /// Fails without modifying the stream if any other instruction jumps to
    /// `id`. A line annotation on the removed instruction moves to the next
    /// instruction when that one has none of its own.
    pub fn remove(&mut self, id: InstrId) -> Result<Instruction, IntegrityError> {
        let position = self
            .index_of(id)
            .ok_or(IntegrityError::UnknownInstruction(id))?;
        let referrers: Vec<InstrId> = self
            .targeting(id)
            .into_iter()
            .filter(|&from| from != id)
            .collect();
        if !referrers.is_empty() {
            return Err(IntegrityError::JumpTarget {
                target: id,
                referrers,
            });
        }
        self.detach(position, id)
    }

    /// Removes `id` after pointing every jump that targets it at `to`.
    pub fn remove_redirect(
        &mut self,
        id: InstrId,
        to: InstrId,
    ) -> Result<Instruction, IntegrityError> {
        if id == to {
            return Err(IntegrityError::SelfRedirect(id));
        }
        let position = self
            .index_of(id)
            .ok_or(IntegrityError::UnknownInstruction(id))?;
        if !self.contains(to) {
            return Err(IntegrityError::UnknownTarget { target: to });
        }
        for from in self.targeting(id) {
            if let Some(instr) = self.get_mut(from) {
                instr.retarget(to);
            }
        }
        self.detach(position, id)
    }

    fn detach(&mut self, position: usize, id: InstrId) -> Result<Instruction, IntegrityError> {
        let removed = self
            .slots
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or(IntegrityError::UnknownInstruction(id))?;
        self.order.remove(position);
        if let (Some(line), Some(&next)) = (removed.line, self.order.get(position)) {
            if let Some(next) = self.get_mut(next) {
                next.line.get_or_insert(line);
            }
        }
        Ok(removed)
    }

    /// Source line of `id`: its own annotation or the nearest one before it.
    pub fn line_of(&self, id: InstrId) -> Option<u32> {
        let position = self.index_of(id)?;
        self.order[..=position]
            .iter()
            .rev()
            .find_map(|&x| self.get(x).and_then(|i| i.line))
    }

    /// Id the next inserted instruction will receive.
    pub(crate) fn next_id(&self) -> InstrId {
        InstrId::from_slot(self.slots.len())
    }

    /// Appends without checking the jump target, for callers that allocate
    /// ids for forward targets via [`next_id`](Self::next_id).
    pub(crate) fn push_unchecked(&mut self, instruction: Instruction) -> InstrId {
        let id = self.next_id();
        self.slots.push(Some(instruction));
        self.order.push(id);
        id
    }

    fn check_target(
        &self,
        instruction: &Instruction,
        own: Option<InstrId>,
    ) -> Result<(), IntegrityError> {
        match instruction.jump_target() {
            Some(target) if Some(target) != own && !self.contains(target) => {
                Err(IntegrityError::UnknownTarget { target })
            }
            _ => Ok(()),
        }
    }
}
