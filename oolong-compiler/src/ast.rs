//! Untyped syntax tree produced by the parser.
//!
//! Every node records the byte offset of its leading token so later stages
//! can position their diagnostics.

#[derive(Debug, Clone)]
pub struct Expression {
    pub offset: usize,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    Identifier(String),
    Slot(u32),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Conditional(ConditionalExpression),
    Coalesce(CoalesceExpression),
    Member(MemberExpression),
    Index(IndexExpression),
    Call(CallExpression),
    Cast(CastExpression),
    New(NewExpression),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Positive,
    Negative,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub condition: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternative: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct CoalesceExpression {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub receiver: Box<Expression>,
    pub name: String,
    pub name_offset: usize,
    pub null_propagating: bool,
}

#[derive(Debug, Clone)]
pub struct IndexExpression {
    pub receiver: Box<Expression>,
    pub index: Box<Expression>,
    pub open_offset: usize,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub open_offset: usize,
}

#[derive(Debug, Clone)]
pub struct CastExpression {
    pub type_name: String,
    pub type_offset: usize,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct NewExpression {
    pub type_name: String,
    pub name_offset: usize,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct LambdaParameter {
    pub name: String,
    pub offset: usize,
}

/// First use of a distinct positional slot in a headerless expression.
#[derive(Debug, Clone, Copy)]
pub struct SlotUse {
    pub index: u32,
    pub offset: usize,
}

/// Parser output: an optional explicit parameter list, the positional
/// slots referenced by the body, and the body itself.
#[derive(Debug, Clone)]
pub struct ParsedLambda {
    pub parameters: Option<Vec<LambdaParameter>>,
    pub slots: Vec<SlotUse>,
    pub body: Expression,
}

impl ParsedLambda {
    /// Highest slot index referenced, if any slot is used.
    pub fn max_slot(&self) -> Option<u32> {
        self.slots.iter().map(|slot| slot.index).max()
    }
}
