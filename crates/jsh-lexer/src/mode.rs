//! Lexer mode stack.
//!
//! The same character means different things depending on where the cursor
//! is: `<` opens a tag at statement level but compares inside parentheses,
//! and identifier-like runs are attribute names inside a tag but host
//! identifiers everywhere else. The scanner keeps one frame per open
//! delimiter so it always knows which reading applies.

/// A lexer context frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Statement position: top level or inside a `{ ... }` block.
    Block,
    /// Inside an object literal or a braced attribute value `{ ... }`.
    ExprBrace,
    /// Inside `( ... )`.
    Paren,
    /// Inside `[ ... ]`.
    Bracket,
    /// Inside an opening tag `<name ...`.
    OpenTag,
    /// Inside a closing tag `</name`.
    CloseTag,
}

impl Mode {
    /// Tag content: attribute-name territory.
    pub fn is_tag(self) -> bool {
        matches!(self, Mode::OpenTag | Mode::CloseTag)
    }

    /// Expression territory, where `<` is always a comparison.
    pub fn is_expression(self) -> bool {
        matches!(self, Mode::ExprBrace | Mode::Paren | Mode::Bracket)
    }

    /// The character that closes this frame.
    pub fn closer(self) -> char {
        match self {
            Mode::Block | Mode::ExprBrace => '}',
            Mode::Paren => ')',
            Mode::Bracket => ']',
            Mode::OpenTag | Mode::CloseTag => '>',
        }
    }
}

/// Stack of open lexer contexts.
///
/// The bottom `Block` frame (top level) is implicit and can never be popped,
/// so the depth never goes below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeStack {
    frames: Vec<Mode>,
}

impl ModeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active mode.
    pub fn current(&self) -> Mode {
        self.frames.last().copied().unwrap_or(Mode::Block)
    }

    /// Number of explicitly pushed frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn in_tag(&self) -> bool {
        self.current().is_tag()
    }

    pub fn push(&mut self, mode: Mode) {
        self.frames.push(mode);
    }

    /// Pop the frame closed by `closer`.
    ///
    /// Returns `None` when the stack is empty or the active frame is closed
    /// by a different character.
    pub fn pop(&mut self, closer: char) -> Option<Mode> {
        match self.frames.last() {
            Some(mode) if mode.closer() == closer => self.frames.pop(),
            _ => None,
        }
    }

    /// `</`: turn the just-opened tag frame into a closing-tag frame.
    pub fn close_tag(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(mode @ Mode::OpenTag) => {
                *mode = Mode::CloseTag;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stack_is_block() {
        let stack = ModeStack::new();
        assert_eq!(stack.current(), Mode::Block);
        assert_eq!(stack.depth(), 0);
        assert!(!stack.in_tag());
    }

    #[test]
    fn test_pop_empty_stack() {
        let mut stack = ModeStack::new();
        assert_eq!(stack.pop('>'), None);
        assert_eq!(stack.pop('}'), None);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_push_and_pop_tag() {
        let mut stack = ModeStack::new();
        stack.push(Mode::OpenTag);
        assert!(stack.in_tag());
        assert_eq!(stack.pop('>'), Some(Mode::OpenTag));
        assert!(!stack.in_tag());
    }

    #[test]
    fn test_pop_rejects_mismatched_closer() {
        let mut stack = ModeStack::new();
        stack.push(Mode::Paren);
        assert_eq!(stack.pop(']'), None);
        assert_eq!(stack.current(), Mode::Paren);
        assert_eq!(stack.pop(')'), Some(Mode::Paren));
    }

    #[test]
    fn test_close_tag_transition() {
        let mut stack = ModeStack::new();
        stack.push(Mode::OpenTag);
        assert!(stack.close_tag());
        assert_eq!(stack.current(), Mode::CloseTag);
        // Only an opening tag frame converts.
        assert!(!stack.close_tag());
    }

    #[test]
    fn test_close_tag_outside_tag() {
        let mut stack = ModeStack::new();
        stack.push(Mode::Block);
        assert!(!stack.close_tag());
        assert_eq!(stack.current(), Mode::Block);
    }

    #[test]
    fn test_expression_frame_inside_tag() {
        let mut stack = ModeStack::new();
        stack.push(Mode::OpenTag);
        stack.push(Mode::ExprBrace);
        assert!(!stack.in_tag());
        assert!(stack.current().is_expression());
        stack.pop('}');
        assert!(stack.in_tag());
    }
}
