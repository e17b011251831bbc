//! Maximum value-stack depth over every reachable path.
//!
//! The stream is split into basic blocks and walked with a worklist of block
//! entry states. An entry state is the stack depth plus the block stack
//! (`SETUP_LOOP`/`SETUP_EXCEPT`/`SETUP_FINALLY`/`SETUP_WITH` frames), which
//! is what exceptional and `break`/`continue` edges need to find their
//! destination and depth.
//!
//! Every instruction executed while a handler frame is active has an implicit
//! edge to that handler. The interpreter unwinds the stack to the frame's
//! level before pushing the three exception values, so that edge always
//! arrives with depth `level + 3` regardless of where it was raised.
//!
//! Handler entries are join points with a tolerance: a finally clause is also
//! entered by falling through (one value pushed) or by `return`/`continue`
//! (two values), so ordinary arrivals up to three values below the unwind
//! depth are accepted. Any other disagreement between paths is a
//! [`StackError::Divergence`].

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::Vec;
use crate::code::{InstrId, Instruction, InstructionStream};
use crate::error::StackError;
use crate::opcode::{Flow, Opcode};

/// Values the interpreter pushes when entering an exception handler.
const EXCEPTION_VALUES: i64 = 3;

/// Result of a successful analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackDepths {
    /// Deepest stack observed on any reachable path.
    pub max: u32,
    /// Depth on entry to each instruction, by program position; `None` for
    /// unreachable instructions.
    pub entry: Vec<Option<u32>>,
}

/// Computes the maximum stack depth of `stream`.
///
/// `arg_count` is informational: arguments live in fast locals, not on the
/// value stack, so every frame starts with an empty stack.
pub fn max_stack_depth(stream: &InstructionStream, arg_count: u32) -> Result<u32, StackError> {
    analyze(stream, arg_count).map(|depths| depths.max)
}

/// Computes per-instruction entry depths and the maximum depth of `stream`.
pub fn analyze(stream: &InstructionStream, arg_count: u32) -> Result<StackDepths, StackError> {
    let analyzer = Analyzer::new(stream)?;
    trace!(
        arg_count,
        instructions = analyzer.instrs.len(),
        blocks = analyzer.blocks.len(),
        "analyzing stack depth"
    );
    analyzer.run()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    Loop { end: usize, level: i64 },
    /// `exit` marks a `SETUP_WITH` block, whose level still counts the
    /// `__exit__` callable sitting below it.
    Handler { target: usize, level: i64, exit: bool },
}

type Frames = SmallVec<[Frame; 4]>;

#[derive(Clone, Debug)]
struct Entry {
    depth: i64,
    frames: Frames,
    /// Set once an exceptional edge has arrived; see the module docs.
    handler: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Normal,
    Unwind,
}

struct Analyzer<'a> {
    instrs: Vec<&'a Instruction>,
    /// Program position of each jump's target.
    targets: Vec<Option<usize>>,
    /// `(start, end)` positions of each basic block.
    blocks: Vec<(usize, usize)>,
    block_of: Vec<usize>,
    entries: Vec<Option<Entry>>,
    worklist: Vec<usize>,
    depth_at: Vec<Option<i64>>,
    max: i64,
}

impl<'a> Analyzer<'a> {
    fn new(stream: &'a InstructionStream) -> Result<Self, StackError> {
        let instrs: Vec<&Instruction> = stream.iter().map(|(_, instr)| instr).collect();
        let position: HashMap<InstrId, usize> = stream
            .ids()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let targets = instrs
            .iter()
            .enumerate()
            .map(|(index, instr)| match instr.jump_target() {
                Some(id) => position
                    .get(&id)
                    .copied()
                    .map(Some)
                    .ok_or(StackError::UnresolvedTarget { index }),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let n = instrs.len();
        let mut leader = crate::vec![false; n];
        if n > 0 {
            leader[0] = true;
        }
        for (i, instr) in instrs.iter().enumerate() {
            if let Some(t) = targets[i] {
                leader[t] = true;
            }
            if instr.opcode().flow() != Flow::Next && i + 1 < n {
                leader[i + 1] = true;
            }
        }

        let mut blocks = Vec::new();
        let mut block_of = crate::vec![0; n];
        for i in 0..n {
            if leader[i] {
                blocks.push((i, i + 1));
            } else if let Some(last) = blocks.last_mut() {
                last.1 = i + 1;
            }
            block_of[i] = blocks.len() - 1;
        }

        Ok(Self {
            entries: crate::vec![None; blocks.len()],
            instrs,
            targets,
            blocks,
            block_of,
            worklist: Vec::new(),
            depth_at: crate::vec![None; n],
            max: 0,
        })
    }

    fn run(mut self) -> Result<StackDepths, StackError> {
        if !self.instrs.is_empty() {
            self.propagate(0, 0, Frames::new(), Edge::Normal)?;
        }
        while let Some(block) = self.worklist.pop() {
            self.walk(block)?;
        }

        let reachable = self.depth_at.iter().filter(|d| d.is_some()).count();
        debug!(
            max = self.max,
            reachable,
            unreachable = self.instrs.len() - reachable,
            "stack depth analysis finished"
        );
        Ok(StackDepths {
            max: to_u32(self.max),
            entry: self.depth_at.iter().map(|d| d.map(to_u32)).collect(),
        })
    }

    fn walk(&mut self, block: usize) -> Result<(), StackError> {
        let Some(entry) = self.entries[block].clone() else {
            return Ok(());
        };
        let (start, end) = self.blocks[block];
        let mut depth = entry.depth;
        let mut frames = entry.frames;

        for index in start..end {
            let instr = self.instrs[index];
            let opcode = instr.opcode();
            let arg = instr.arg();
            self.depth_at[index] = Some(depth);
            self.observe(depth);

            if let Some(pos) = frames.iter().rposition(|f| matches!(f, Frame::Handler { .. })) {
                if let Frame::Handler { target, level, .. } = frames[pos] {
                    let below: Frames = frames[..pos].iter().copied().collect();
                    self.propagate(target, level + EXCEPTION_VALUES, below, Edge::Unwind)?;
                }
            }

            match opcode.flow() {
                Flow::Next | Flow::EndFinally => {
                    depth = self.apply(index, opcode, depth, opcode.stack_effect(arg, false))?;
                }
                Flow::Jump => {
                    let target = self.target(index)?;
                    let after = self.apply(index, opcode, depth, opcode.stack_effect(arg, true))?;
                    return self.propagate(target, after, frames, Edge::Normal);
                }
                Flow::Branch => {
                    let target = self.target(index)?;
                    let taken = self.apply(index, opcode, depth, opcode.stack_effect(arg, true))?;
                    self.propagate(target, taken, frames.clone(), Edge::Normal)?;
                    depth = self.apply(index, opcode, depth, opcode.stack_effect(arg, false))?;
                }
                Flow::Return | Flow::Raise => {
                    self.apply(index, opcode, depth, opcode.stack_effect(arg, false))?;
                    return Ok(());
                }
                Flow::SetupLoop => {
                    let end = self.target(index)?;
                    frames.push(Frame::Loop { end, level: depth });
                }
                Flow::SetupExcept | Flow::SetupFinally => {
                    let target = self.target(index)?;
                    frames.push(Frame::Handler {
                        target,
                        level: depth,
                        exit: false,
                    });
                }
                Flow::SetupWith => {
                    let target = self.target(index)?;
                    // The context manager is replaced by its __exit__ before
                    // the block is pushed; the stack level stays the same.
                    if depth < 1 {
                        return Err(StackError::Underflow {
                            index,
                            opcode,
                            depth,
                        });
                    }
                    frames.push(Frame::Handler {
                        target,
                        level: depth,
                        exit: true,
                    });
                    depth = self.apply(index, opcode, depth, opcode.stack_effect(arg, false))?;
                }
                Flow::PopBlock => {
                    if frames.pop().is_none() {
                        return Err(StackError::UnbalancedBlock { index, opcode });
                    }
                }
                Flow::BreakLoop => {
                    let (pos, end, level) = innermost_loop(&frames)
                        .ok_or(StackError::UnbalancedBlock { index, opcode })?;
                    frames.truncate(pos);
                    return self.propagate(end, level, frames, Edge::Normal);
                }
                Flow::ContinueLoop => {
                    let target = self.target(index)?;
                    let (pos, _, _) = innermost_loop(&frames)
                        .ok_or(StackError::UnbalancedBlock { index, opcode })?;
                    // Unwinding stops at the loop; the stack is left at the
                    // level of the outermost block popped on the way. A with
                    // block's cleanup also pops its __exit__ before jumping.
                    let after = match frames.get(pos + 1) {
                        Some(&Frame::Handler {
                            level, exit: true, ..
                        }) => level - 1,
                        Some(&Frame::Loop { level, .. }) | Some(&Frame::Handler { level, .. }) => level,
                        None => depth,
                    };
                    frames.truncate(pos + 1);
                    return self.propagate(target, after, frames, Edge::Normal);
                }
            }
        }

        if end < self.instrs.len() {
            self.propagate(end, depth, frames, Edge::Normal)
        } else {
            trace!(depth, "control falls off the end of the code");
            Ok(())
        }
    }

    fn apply(&mut self, index: usize, opcode: Opcode, depth: i64, effect: i32) -> Result<i64, StackError> {
        let after = depth + i64::from(effect);
        if after < 0 {
            return Err(StackError::Underflow {
                index,
                opcode,
                depth,
            });
        }
        self.observe(after);
        Ok(after)
    }

    fn target(&self, index: usize) -> Result<usize, StackError> {
        self.targets[index].ok_or(StackError::UnresolvedTarget { index })
    }

    fn observe(&mut self, depth: i64) {
        self.max = self.max.max(depth);
    }

    fn propagate(&mut self, to: usize, depth: i64, frames: Frames, edge: Edge) -> Result<(), StackError> {
        let block = self.block_of[to];
        let index = self.blocks[block].0;
        self.observe(depth);

        if self.entries[block].is_none() {
            self.entries[block] = Some(Entry {
                depth,
                frames,
                handler: edge == Edge::Unwind,
            });
            self.worklist.push(block);
            return Ok(());
        }
        let Some(entry) = self.entries[block].as_mut() else {
            return Ok(());
        };

        let diverged = || StackError::Divergence {
            index,
            expected: entry.depth,
            found: depth,
        };
        match (entry.handler, edge) {
            (false, Edge::Normal) | (true, Edge::Unwind) => {
                if depth != entry.depth {
                    return Err(diverged());
                }
            }
            (true, Edge::Normal) => {
                if depth > entry.depth || depth < entry.depth - EXCEPTION_VALUES {
                    return Err(diverged());
                }
            }
            (false, Edge::Unwind) => {
                if depth < entry.depth || depth - EXCEPTION_VALUES > entry.depth {
                    return Err(diverged());
                }
                let deeper = depth > entry.depth;
                *entry = Entry {
                    depth,
                    frames,
                    handler: true,
                };
                if deeper {
                    self.worklist.push(block);
                }
            }
        }
        Ok(())
    }
}

/// Position, end target and stack level of the innermost loop frame.
fn innermost_loop(frames: &Frames) -> Option<(usize, usize, i64)> {
    frames.iter().enumerate().rev().find_map(|(pos, frame)| match *frame {
        Frame::Loop { end, level } => Some((pos, end, level)),
        Frame::Handler { .. } => None,
    })
}

fn to_u32(depth: i64) -> u32 {
    u32::try_from(depth).unwrap_or(u32::MAX)
}
