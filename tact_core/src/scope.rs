//! Symbols, frames and opaque type handles of the declaration scope tree.
//!
//! The front end resolves names into [`Symbol`]s registered in [`Frame`]s;
//! the document model stores the handles and looks them up when resolving
//! edge endpoints, merging parameter lists and reporting diagnostics.
//! Types are opaque [`TypeRef`]s the model compares but never interprets.

use crate::position::Position;

/// An indexing object for symbols of a document.
///
/// These cannot be directly created or manipulated,
/// but have to be generated and/or provided by a [`SymbolTable`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(u32);

/// An indexing object for frames, i.e., symbol lists with a parent scope.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Frame(u32);

/// Opaque handle to a type produced by the front end's type representation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeRef(u32);

impl TypeRef {
    /// Handle used before the type checker has assigned a type.
    pub const UNTYPED: TypeRef = TypeRef(0);

    /// Wraps a raw type index handed out by the type representation.
    pub const fn new(raw: u32) -> Self {
        TypeRef(raw)
    }

    /// The raw type index.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for TypeRef {
    fn default() -> Self {
        Self::UNTYPED
    }
}

/// The document entity a symbol is bound to.
///
/// Entity-carrying variants store the ordinal of the entity within its
/// owning template; edge-endpoint and instance-line resolution go through
/// this slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolData {
    /// Not bound to any entity (yet).
    #[default]
    None,
    /// A variable of some declaration block.
    Variable,
    /// A formal parameter of a template or instance.
    Parameter,
    /// A location, with its ordinal in the owning template.
    Location(u32),
    /// A branchpoint, with its ordinal in the owning template.
    Branchpoint(u32),
    /// A function of some declaration block.
    Function,
    /// A template definition.
    Template,
    /// A (partial) instance.
    Instance,
    /// An LSC instance line, with its ordinal in the owning template.
    InstanceLine(u32),
}

#[derive(Debug, Clone)]
struct SymbolRecord {
    name: String,
    ty: TypeRef,
    position: Position,
    data: SymbolData,
}

#[derive(Debug, Clone, Default)]
struct FrameRecord {
    parent: Option<Frame>,
    symbols: Vec<Symbol>,
}

/// Arena of all symbols and frames of a document.
///
/// Storage is append-only, so handles stay valid for the lifetime of the
/// table. A symbol is created in exactly one frame but may be shared into
/// further frames with [`SymbolTable::push`], which is how merged parameter
/// lists are built.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolRecord>,
    frames: Vec<FrameRecord>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new frame with the given parent scope.
    pub fn new_frame(&mut self, parent: Option<Frame>) -> Frame {
        let frame = Frame(self.frames.len() as u32);
        self.frames.push(FrameRecord {
            parent,
            symbols: Vec::new(),
        });
        frame
    }

    /// Creates a new symbol in `frame`.
    pub fn new_symbol(
        &mut self,
        frame: Frame,
        name: &str,
        ty: TypeRef,
        position: Position,
    ) -> Symbol {
        let symbol = Symbol(self.symbols.len() as u32);
        self.symbols.push(SymbolRecord {
            name: name.to_string(),
            ty,
            position,
            data: SymbolData::None,
        });
        self.frames[frame.0 as usize].symbols.push(symbol);
        symbol
    }

    /// Shares an existing symbol into another frame.
    pub fn push(&mut self, frame: Frame, symbol: Symbol) {
        self.frames[frame.0 as usize].symbols.push(symbol);
    }

    /// Binds a symbol to the entity it names.
    pub fn set_data(&mut self, symbol: Symbol, data: SymbolData) {
        self.symbols[symbol.0 as usize].data = data;
    }

    /// The entity a symbol is bound to.
    pub fn data(&self, symbol: Symbol) -> SymbolData {
        self.symbols[symbol.0 as usize].data
    }

    /// The name of a symbol.
    pub fn name(&self, symbol: Symbol) -> &str {
        &self.symbols[symbol.0 as usize].name
    }

    /// The type handle of a symbol.
    pub fn type_of(&self, symbol: Symbol) -> TypeRef {
        self.symbols[symbol.0 as usize].ty
    }

    /// Re-assigns the type handle of a symbol (type-checker annotation).
    pub fn set_type(&mut self, symbol: Symbol, ty: TypeRef) {
        self.symbols[symbol.0 as usize].ty = ty;
    }

    /// The source position where a symbol was declared.
    pub fn position_of(&self, symbol: Symbol) -> Position {
        self.symbols[symbol.0 as usize].position
    }

    /// The parent scope of a frame.
    pub fn parent(&self, frame: Frame) -> Option<Frame> {
        self.frames[frame.0 as usize].parent
    }

    /// The symbols of a frame, in registration order.
    pub fn symbols(&self, frame: Frame) -> &[Symbol] {
        &self.frames[frame.0 as usize].symbols
    }

    /// True if `frame` itself (not a parent) holds a symbol named `name`.
    pub fn contains(&self, frame: Frame, name: &str) -> bool {
        self.frames[frame.0 as usize]
            .symbols
            .iter()
            .any(|&s| self.name(s) == name)
    }

    /// Resolves a name in `frame`, walking parent scopes outwards.
    pub fn resolve(&self, frame: Frame, name: &str) -> Option<Symbol> {
        let mut current = Some(frame);
        while let Some(frame) = current {
            let record = &self.frames[frame.0 as usize];
            if let Some(&symbol) = record.symbols.iter().find(|&&s| self.name(s) == name) {
                return Some(symbol);
            }
            current = record.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_walks_parent_frames() {
        let mut table = SymbolTable::new();
        let global = table.new_frame(None);
        let inner = table.new_frame(Some(global));
        let x = table.new_symbol(global, "x", TypeRef::UNTYPED, Position::default());
        let y = table.new_symbol(inner, "y", TypeRef::UNTYPED, Position::default());
        assert_eq!(table.resolve(inner, "x"), Some(x));
        assert_eq!(table.resolve(inner, "y"), Some(y));
        assert_eq!(table.resolve(global, "y"), None);
        assert!(!table.contains(inner, "x"));
    }

    #[test]
    fn shared_symbols_keep_one_record() {
        let mut table = SymbolTable::new();
        let a = table.new_frame(None);
        let b = table.new_frame(None);
        let s = table.new_symbol(a, "n", TypeRef::UNTYPED, Position::default());
        table.push(b, s);
        table.set_data(s, SymbolData::Parameter);
        assert_eq!(table.symbols(b), &[s]);
        assert_eq!(table.data(table.symbols(b)[0]), SymbolData::Parameter);
    }
}
