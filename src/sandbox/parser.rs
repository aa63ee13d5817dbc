//! Parser for the builder-script dialect.
//!
//! Recursive descent over the token stream from [`super::lexer`].
//! Semicolons are optional statement terminators. Template string
//! substitutions, captured as raw source by the lexer, are lexed and
//! parsed here recursively.

use super::lexer::{lex, Tok, Token, TplPart};

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Const,
    Let,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        name: String,
        init: Option<Expr>,
    },
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        alt: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        var: String,
        iter: Expr,
        body: Box<Stmt>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TplExpr {
    Lit(String),
    Sub(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Template(Vec<TplExpr>),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    /// `++x` / `x++` / `--x` / `x--`; `inc` is the sign of the step.
    Update {
        inc: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        and: bool,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        alt: Box<Expr>,
    },
    /// `op` is None for plain `=`, Some for compound assignment.
    Assign {
        op: Option<BinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        ctor: String,
        args: Vec<Expr>,
    },
    Member {
        obj: Box<Expr>,
        prop: String,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
}

pub fn parse(source: &str) -> Result<Vec<Stmt>, String> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(tokens);
    parser.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(0)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).map(|t| t.tok.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> String {
        format!("line {}: {}", self.line(), msg.into())
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Tok) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.err(format!("expected '{expected}', found '{found}'"))),
                None => Err(self.err(format!("expected '{expected}', found end of input"))),
            }
        }
    }

    /// True if the next token is the given keyword identifier.
    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(name)) if name == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Tok::Ident(name)) => Ok(name),
            Some(other) => Err(self.err(format!("expected identifier, found '{other}'"))),
            None => Err(self.err("expected identifier, found end of input")),
        }
    }

    // ── Statements ──────────────────────────────────────

    fn program(&mut self) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            if self.eat(&Tok::Semi) {
                continue;
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        let stmt = if self.at_keyword("const") || self.at_keyword("let") || self.at_keyword("var")
        {
            self.var_decl()?
        } else if self.at_keyword("if") {
            self.if_stmt()?
        } else if self.at_keyword("while") {
            self.while_stmt()?
        } else if self.at_keyword("for") {
            self.for_stmt()?
        } else if self.at_keyword("function") {
            self.function_decl()?
        } else if self.eat_keyword("return") {
            let value = if self.peek().is_none()
                || self.peek() == Some(&Tok::Semi)
                || self.peek() == Some(&Tok::RBrace)
            {
                None
            } else {
                Some(self.expression()?)
            };
            Stmt::Return(value)
        } else if self.eat_keyword("break") {
            Stmt::Break
        } else if self.eat_keyword("continue") {
            Stmt::Continue
        } else if self.eat_keyword("throw") {
            Stmt::Throw(self.expression()?)
        } else if self.peek() == Some(&Tok::LBrace) {
            self.block()?
        } else {
            Stmt::Expr(self.expression()?)
        };
        self.eat(&Tok::Semi);
        Ok(stmt)
    }

    fn var_decl(&mut self) -> Result<Stmt, String> {
        let kind = match self.bump() {
            Some(Tok::Ident(kw)) if kw == "const" => DeclKind::Const,
            // `var` is accepted and treated as `let`
            _ => DeclKind::Let,
        };
        let name = self.expect_ident()?;
        let init = if self.eat(&Tok::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl { kind, name, init })
    }

    fn block(&mut self) -> Result<Stmt, String> {
        self.expect(&Tok::LBrace)?;
        let mut stmts = Vec::new();
        while self.peek().is_some() && self.peek() != Some(&Tok::RBrace) {
            if self.eat(&Tok::Semi) {
                continue;
            }
            stmts.push(self.statement()?);
        }
        self.expect(&Tok::RBrace)?;
        Ok(Stmt::Block(stmts))
    }

    fn if_stmt(&mut self) -> Result<Stmt, String> {
        self.eat_keyword("if");
        self.expect(&Tok::LParen)?;
        let cond = self.expression()?;
        self.expect(&Tok::RParen)?;
        let then = Box::new(self.statement()?);
        let alt = if self.eat_keyword("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then, alt })
    }

    fn while_stmt(&mut self) -> Result<Stmt, String> {
        self.eat_keyword("while");
        self.expect(&Tok::LParen)?;
        let cond = self.expression()?;
        self.expect(&Tok::RParen)?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn for_stmt(&mut self) -> Result<Stmt, String> {
        self.eat_keyword("for");
        self.expect(&Tok::LParen)?;

        // `for (const x of expr)` / `for (let x of expr)`
        if self.at_keyword("const") || self.at_keyword("let") || self.at_keyword("var") {
            let checkpoint = self.pos;
            self.bump();
            let name = self.expect_ident()?;
            if self.eat_keyword("of") {
                let iter = self.expression()?;
                self.expect(&Tok::RParen)?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForOf {
                    var: name,
                    iter,
                    body,
                });
            }
            self.pos = checkpoint;
        }

        let init = if self.peek() == Some(&Tok::Semi) {
            None
        } else if self.at_keyword("const") || self.at_keyword("let") || self.at_keyword("var") {
            Some(Box::new(self.var_decl()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect(&Tok::Semi)?;

        let cond = if self.peek() == Some(&Tok::Semi) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Tok::Semi)?;

        let update = if self.peek() == Some(&Tok::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Tok::RParen)?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn function_decl(&mut self) -> Result<Stmt, String> {
        self.eat_keyword("function");
        let name = self.expect_ident()?;
        self.expect(&Tok::LParen)?;
        let mut params = Vec::new();
        if self.peek() != Some(&Tok::RParen) {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        let body = match self.block()? {
            Stmt::Block(stmts) => stmts,
            _ => unreachable!(),
        };
        Ok(Stmt::Function { name, params, body })
    }

    // ── Expressions, by precedence ──────────────────────

    fn expression(&mut self) -> Result<Expr, String> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, String> {
        let lhs = self.ternary()?;
        let op = match self.peek() {
            Some(Tok::Assign) => None,
            Some(Tok::PlusAssign) => Some(BinOp::Add),
            Some(Tok::MinusAssign) => Some(BinOp::Sub),
            Some(Tok::StarAssign) => Some(BinOp::Mul),
            Some(Tok::SlashAssign) => Some(BinOp::Div),
            _ => return Ok(lhs),
        };
        if !matches!(lhs, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
            return Err(self.err("invalid assignment target"));
        }
        self.bump();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(lhs),
            value: Box::new(value),
        })
    }

    fn ternary(&mut self) -> Result<Expr, String> {
        let cond = self.logical_or()?;
        if self.eat(&Tok::Question) {
            let then = self.assignment()?;
            self.expect(&Tok::Colon)?;
            let alt = self.assignment()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                alt: Box::new(alt),
            });
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.logical_and()?;
        while self.eat(&Tok::OrOr) {
            let rhs = self.logical_and()?;
            lhs = Expr::Logical {
                and: false,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.equality()?;
        while self.eat(&Tok::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::Logical {
                and: true,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinOp::Eq,
                Some(Tok::NotEq) => BinOp::Ne,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.relational()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn relational(&mut self) -> Result<Expr, String> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => BinOp::Lt,
                Some(Tok::Gt) => BinOp::Gt,
                Some(Tok::Le) => BinOp::Le,
                Some(Tok::Ge) => BinOp::Ge,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                Some(Tok::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        let op = match self.peek() {
            Some(Tok::Minus) => Some(UnOp::Neg),
            Some(Tok::Plus) => Some(UnOp::Pos),
            Some(Tok::Not) => Some(UnOp::Not),
            Some(Tok::PlusPlus) | Some(Tok::MinusMinus) => {
                let inc = self.peek() == Some(&Tok::PlusPlus);
                self.bump();
                let target = self.unary()?;
                if !matches!(target, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. })
                {
                    return Err(self.err("invalid increment target"));
                }
                return Ok(Expr::Update {
                    inc,
                    prefix: true,
                    target: Box::new(target),
                });
            }
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let expr = self.call_chain()?;
        if matches!(self.peek(), Some(Tok::PlusPlus) | Some(Tok::MinusMinus)) {
            let inc = self.peek() == Some(&Tok::PlusPlus);
            self.bump();
            if !matches!(expr, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
                return Err(self.err("invalid increment target"));
            }
            return Ok(Expr::Update {
                inc,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_chain(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Tok::Dot) {
                let prop = self.expect_ident()?;
                expr = Expr::Member {
                    obj: Box::new(expr),
                    prop,
                };
            } else if self.eat(&Tok::LBracket) {
                let index = self.expression()?;
                self.expect(&Tok::RBracket)?;
                expr = Expr::Index {
                    obj: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.peek() == Some(&Tok::LParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        self.expect(&Tok::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Tok::RParen) {
            loop {
                args.push(self.assignment()?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Tok::Num(n)) => {
                self.bump();
                Ok(Expr::Num(n))
            }
            Some(Tok::Str(s)) => {
                self.bump();
                Ok(Expr::Str(s))
            }
            Some(Tok::Template(parts)) => {
                self.bump();
                let mut exprs = Vec::new();
                for part in parts {
                    match part {
                        TplPart::Lit(s) => exprs.push(TplExpr::Lit(s)),
                        TplPart::Expr(src) => {
                            let tokens = lex(&src)?;
                            let mut sub = Parser::new(tokens);
                            let expr = sub.expression()?;
                            if sub.peek().is_some() {
                                return Err(
                                    sub.err("unexpected token after template substitution")
                                );
                            }
                            exprs.push(TplExpr::Sub(Box::new(expr)));
                        }
                    }
                }
                Ok(Expr::Template(exprs))
            }
            Some(Tok::Ident(name)) => match name.as_str() {
                "true" => {
                    self.bump();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.bump();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.bump();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.bump();
                    Ok(Expr::Undefined)
                }
                "new" => {
                    self.bump();
                    let ctor = self.expect_ident()?;
                    let args = if self.peek() == Some(&Tok::LParen) {
                        self.arguments()?
                    } else {
                        Vec::new()
                    };
                    Ok(Expr::New { ctor, args })
                }
                _ => {
                    self.bump();
                    Ok(Expr::Ident(name))
                }
            },
            Some(Tok::LParen) => {
                self.bump();
                let expr = self.expression()?;
                self.expect(&Tok::RParen)?;
                Ok(expr)
            }
            Some(Tok::LBracket) => {
                self.bump();
                let mut items = Vec::new();
                if self.peek() != Some(&Tok::RBracket) {
                    loop {
                        items.push(self.assignment()?);
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                        // trailing comma
                        if self.peek() == Some(&Tok::RBracket) {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Expr::Array(items))
            }
            Some(Tok::LBrace) => {
                self.bump();
                let mut props = Vec::new();
                if self.peek() != Some(&Tok::RBrace) {
                    loop {
                        let key = match self.bump() {
                            Some(Tok::Ident(name)) => name,
                            Some(Tok::Str(s)) => s,
                            Some(Tok::Num(n)) => format!("{n}"),
                            other => {
                                return Err(self.err(format!(
                                    "expected property name, found '{}'",
                                    other.map(|t| t.to_string()).unwrap_or_default()
                                )))
                            }
                        };
                        self.expect(&Tok::Colon)?;
                        props.push((key, self.assignment()?));
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                        if self.peek() == Some(&Tok::RBrace) {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RBrace)?;
                Ok(Expr::Object(props))
            }
            Some(other) => Err(self.err(format!("unexpected token '{other}'"))),
            None => Err(self.err("unexpected end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_statement() {
        let stmts = parse("const builder = new LDrawBuilder('Car');").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::VarDecl { kind, name, init } => {
                assert_eq!(*kind, DeclKind::Const);
                assert_eq!(name, "builder");
                assert!(matches!(init, Some(Expr::New { ctor, args })
                    if ctor == "LDrawBuilder" && args.len() == 1));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_method_call_with_negative_args() {
        let stmts = parse("builder.addPart('3001', 4, 0, -8, 0)").unwrap();
        match &stmts[0] {
            Stmt::Expr(Expr::Call { callee, args }) => {
                assert!(matches!(&**callee, Expr::Member { prop, .. } if prop == "addPart"));
                assert_eq!(args.len(), 5);
                assert!(matches!(&args[3], Expr::Unary { op: UnOp::Neg, .. }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_chained_calls() {
        let stmts = parse("builder.addStep().addPart('1', 0, 0, 0, 0)").unwrap();
        match &stmts[0] {
            Stmt::Expr(Expr::Call { callee, .. }) => {
                assert!(matches!(&**callee, Expr::Member { obj, prop }
                    if prop == "addPart" && matches!(&**obj, Expr::Call { .. })));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_classic_for_loop() {
        let stmts = parse("for (let i = 0; i < 4; i++) { builder.addStep(); }").unwrap();
        match &stmts[0] {
            Stmt::For {
                init,
                cond,
                update,
                ..
            } => {
                assert!(init.is_some());
                assert!(cond.is_some());
                assert!(matches!(update, Some(Expr::Update { inc: true, prefix: false, .. })));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_for_of_loop() {
        let stmts = parse("for (const p of parts) { use(p); }").unwrap();
        assert!(matches!(&stmts[0], Stmt::ForOf { var, .. } if var == "p"));
    }

    #[test]
    fn test_missing_semicolons_tolerated() {
        let stmts = parse("let a = 1\nlet b = 2\nbuilder.addStep()").unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_function_declaration() {
        let stmts = parse("function wall(x, h) { return x * h; }").unwrap();
        match &stmts[0] {
            Stmt::Function { name, params, body } => {
                assert_eq!(name, "wall");
                assert_eq!(params, &["x".to_string(), "h".to_string()]);
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_array_and_object_literals() {
        let stmts = parse("const xs = [1, 2, 3]; const o = {x: 1, 'y': 2};").unwrap();
        assert!(matches!(&stmts[0], Stmt::VarDecl { init: Some(Expr::Array(items)), .. }
            if items.len() == 3));
        assert!(matches!(&stmts[1], Stmt::VarDecl { init: Some(Expr::Object(props)), .. }
            if props.len() == 2));
    }

    #[test]
    fn test_precedence() {
        let stmts = parse("1 + 2 * 3").unwrap();
        match &stmts[0] {
            Stmt::Expr(Expr::Binary { op: BinOp::Add, rhs, .. }) => {
                assert!(matches!(&**rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_ternary() {
        let stmts = parse("const c = i % 2 == 0 ? 4 : 1").unwrap();
        assert!(matches!(&stmts[0], Stmt::VarDecl { init: Some(Expr::Ternary { .. }), .. }));
    }

    #[test]
    fn test_template_substitution_parsed() {
        let stmts = parse("const msg = `row ${i + 1} done`").unwrap();
        match &stmts[0] {
            Stmt::VarDecl {
                init: Some(Expr::Template(parts)),
                ..
            } => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[1], TplExpr::Sub(e)
                    if matches!(&**e, Expr::Binary { op: BinOp::Add, .. })));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_if_else() {
        let stmts = parse("if (a > 1) { b(); } else { c(); }").unwrap();
        assert!(matches!(&stmts[0], Stmt::If { alt: Some(_), .. }));
    }

    #[test]
    fn test_index_assignment() {
        let stmts = parse("xs[0] = 5").unwrap();
        assert!(matches!(&stmts[0], Stmt::Expr(Expr::Assign { op: None, .. })));
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let err = parse("let a = 1\nlet = 2").unwrap_err();
        assert!(err.starts_with("line 2:"), "{err}");
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse("1 = 2").is_err());
        assert!(parse("f() = 2").is_err());
    }
}
