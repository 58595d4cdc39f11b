use crate::descriptor::{InstrumentDescriptor, RegionNode};
use crate::opcodes::Opcodes;
use crate::parser::normalize_path;
use crate::parser::parse::Token;

/// Nesting depth of the tree-forming sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Global,
    Master,
    Group,
    Region,
}

impl Level {
    fn from_header(name: &str) -> Option<Self> {
        match name {
            "global" => Some(Self::Global),
            "master" => Some(Self::Master),
            "group" => Some(Self::Group),
            "region" => Some(Self::Region),
            _ => None,
        }
    }
}

/// Where opcodes currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Before any header
    None,
    Control,
    Tree,
    /// `<curve>`, `<effect>` and other sections the engine does not use
    Ignored,
}

/// Builds the region tree from a stream of tokens.
///
/// Open sections form a stack ordered by level. A new header closes every
/// open section at the same or a deeper level, attaching each closed node
/// to the section below it.
pub(super) struct TreeBuilder {
    roots: Vec<RegionNode>,
    stack: Vec<(Level, RegionNode)>,
    default_path: String,
    target: Target,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            stack: Vec::new(),
            default_path: String::new(),
            target: Target::None,
        }
    }
}

impl TreeBuilder {
    pub(super) fn push(&mut self, token: Token<'_>) {
        match token {
            Token::Header(name) => self.open(&name.to_ascii_lowercase()),
            Token::Opcode(name, value) => self.set(name, value),
        }
    }

    fn open(&mut self, name: &str) {
        if name == "control" {
            self.target = Target::Control;
            return;
        }
        let Some(level) = Level::from_header(name) else {
            log::debug!("Ignoring <{}> section", name);
            self.target = Target::Ignored;
            return;
        };

        self.close_to(level);
        let node = match level {
            Level::Region => RegionNode::leaf(Opcodes::default()),
            _ => RegionNode::group(Opcodes::default(), Vec::new()),
        };
        self.stack.push((level, node));
        self.target = Target::Tree;
    }

    fn set(&mut self, name: &str, value: &str) {
        match self.target {
            Target::Control if name == "default_path" => {
                self.default_path = normalize_path(value);
            }
            Target::Control => log::debug!("Ignoring control opcode '{}'", name),
            Target::Tree => {
                if let Some((_, node)) = self.stack.last_mut() {
                    if name == "sample" {
                        node.opcodes.set(name, &normalize_path(value));
                    } else {
                        node.opcodes.set(name, value);
                    }
                }
            }
            Target::None => log::warn!("Opcode '{}' outside of any section", name),
            Target::Ignored => {}
        }
    }

    /// Close every open section at `level` or deeper.
    fn close_to(&mut self, level: Level) {
        while matches!(self.stack.last(), Some((open, _)) if *open >= level) {
            if let Some((_, node)) = self.stack.pop() {
                self.attach(node);
            }
        }
    }

    fn attach(&mut self, node: RegionNode) {
        match self.stack.last_mut() {
            Some((_, parent)) => parent
                .regions
                .get_or_insert_with(Vec::new)
                .push(Some(node)),
            None => self.roots.push(node),
        }
    }

    pub(super) fn finish(mut self) -> InstrumentDescriptor {
        self.close_to(Level::Global);
        InstrumentDescriptor::new(self.default_path, self.roots)
    }
}
