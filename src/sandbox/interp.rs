//! Tree-walking evaluator for the builder-script dialect.
//!
//! The environment is the capability allow-list: generated code can reach
//! the `LDrawBuilder` constructor, the `Colors` table, a `console` shim
//! (re-logged through tracing), and a small `Math` namespace. Nothing
//! else resolves — there is no filesystem, no process, no dynamic
//! evaluation, no module loading.
//!
//! The evaluator checks a wall-clock deadline every few hundred steps, so
//! runaway loops abort deterministically without killing threads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use tracing::{info, warn};

use super::parser::{BinOp, Expr, Stmt, TplExpr, UnOp};
use crate::ldraw::{colors, LdrawBuilder, IDENTITY};

/// Maximum user-function call depth.
const MAX_CALL_DEPTH: u32 = 100;

/// Why evaluation stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    /// Wall-clock deadline exceeded.
    Timeout,
    /// Uncaught script error, with the underlying message.
    Error(String),
}

/// Output captured by the sandboxed `save` in place of file I/O.
#[derive(Debug, Clone)]
pub struct Captured {
    pub content: String,
    pub part_count: usize,
}

#[derive(Debug, Clone)]
pub struct FuncDef {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeObj {
    Console,
    Math,
}

#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<HashMap<String, Value>>>),
    Func(Rc<FuncDef>),
    Builder(Rc<RefCell<LdrawBuilder>>),
    Native(NativeObj),
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Debug)]
pub struct Interp {
    globals: HashMap<String, Value>,
    locals: Vec<HashMap<String, Value>>,
    deadline: Instant,
    ops: u64,
    depth: u32,
    /// xorshift state for Math.random — deterministic per run.
    rand_state: u64,
    captured: Option<Captured>,
    pub logs: Vec<String>,
}

impl Interp {
    pub fn new(deadline: Instant) -> Self {
        let mut globals = HashMap::new();

        let color_table: HashMap<String, Value> = colors::ALL
            .iter()
            .map(|(name, code)| (name.to_string(), Value::Num(*code as f64)))
            .collect();
        globals.insert(
            "Colors".to_string(),
            Value::Object(Rc::new(RefCell::new(color_table))),
        );
        globals.insert("console".to_string(), Value::Native(NativeObj::Console));
        globals.insert("Math".to_string(), Value::Native(NativeObj::Math));

        Self {
            globals,
            locals: Vec::new(),
            deadline,
            ops: 0,
            depth: 0,
            rand_state: 0x2545_f491_4f6c_dd1d,
            captured: None,
            logs: Vec::new(),
        }
    }

    /// Runs a full program. Function declarations at the top level are
    /// hoisted before the first statement executes.
    pub fn run(&mut self, program: &[Stmt]) -> Result<(), Interrupt> {
        for stmt in program {
            if let Stmt::Function { name, params, body } = stmt {
                self.declare(
                    name.clone(),
                    Value::Func(Rc::new(FuncDef {
                        params: params.clone(),
                        body: body.clone(),
                    })),
                );
            }
        }
        for stmt in program {
            match self.eval_stmt(stmt)? {
                Flow::Normal => {}
                Flow::Break | Flow::Continue => {
                    return Err(Interrupt::Error(
                        "break/continue outside of a loop".to_string(),
                    ))
                }
                Flow::Return(_) => {
                    return Err(Interrupt::Error(
                        "return outside of a function".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// End-of-run guard: if a global `builder` binding holds a builder,
    /// capture its rendered output (the sandboxed equivalent of forcing
    /// a final `save` call). Returns false when no such binding exists.
    pub fn capture_builder_output(&mut self) -> bool {
        let rc = match self.globals.get("builder") {
            Some(Value::Builder(rc)) => rc.clone(),
            _ => return false,
        };
        let b = rc.borrow();
        self.captured = Some(Captured {
            content: b.to_ldraw(),
            part_count: b.part_count(),
        });
        true
    }

    pub fn take_captured(&mut self) -> Option<Captured> {
        self.captured.take()
    }

    // ── Environment ─────────────────────────────────────

    fn declare(&mut self, name: String, value: Value) {
        match self.locals.last_mut() {
            Some(frame) => {
                frame.insert(name, value);
            }
            None => {
                self.globals.insert(name, value);
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.locals.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(v.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    /// Assigns to the nearest binding; undeclared names land in globals.
    fn assign_var(&mut self, name: &str, value: Value) {
        for frame in self.locals.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    fn tick(&mut self) -> Result<(), Interrupt> {
        self.ops += 1;
        if (self.ops & 0x01ff) == 0 && Instant::now() >= self.deadline {
            return Err(Interrupt::Timeout);
        }
        Ok(())
    }

    // ── Statements ──────────────────────────────────────

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Interrupt> {
        self.tick()?;
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                self.declare(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => {
                self.locals.push(HashMap::new());
                let result = self.eval_block_body(stmts);
                self.locals.pop();
                result
            }
            Stmt::If { cond, then, alt } => {
                if truthy(&self.eval_expr(cond)?) {
                    self.eval_stmt(then)
                } else if let Some(alt) = alt {
                    self.eval_stmt(alt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                loop {
                    self.tick()?;
                    if !truthy(&self.eval_expr(cond)?) {
                        break;
                    }
                    match self.eval_stmt(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.locals.push(HashMap::new());
                let result = self.eval_for(init.as_deref(), cond, update, body);
                self.locals.pop();
                result
            }
            Stmt::ForOf { var, iter, body } => {
                let items = match self.eval_expr(iter)? {
                    Value::Array(rc) => rc.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    other => {
                        return Err(Interrupt::Error(format!(
                            "{} is not iterable",
                            type_name(&other)
                        )))
                    }
                };
                for item in items {
                    self.tick()?;
                    self.locals.push(HashMap::new());
                    self.declare(var.clone(), item);
                    let flow = self.eval_stmt(body);
                    self.locals.pop();
                    match flow? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function { name, params, body } => {
                self.declare(
                    name.clone(),
                    Value::Func(Rc::new(FuncDef {
                        params: params.clone(),
                        body: body.clone(),
                    })),
                );
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                Err(Interrupt::Error(display(&value)))
            }
        }
    }

    fn eval_block_body(&mut self, stmts: &[Stmt]) -> Result<Flow, Interrupt> {
        for stmt in stmts {
            match self.eval_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_for(
        &mut self,
        init: Option<&Stmt>,
        cond: &Option<Expr>,
        update: &Option<Expr>,
        body: &Stmt,
    ) -> Result<Flow, Interrupt> {
        if let Some(init) = init {
            self.eval_stmt(init)?;
        }
        loop {
            self.tick()?;
            if let Some(cond) = cond {
                if !truthy(&self.eval_expr(cond)?) {
                    break;
                }
            }
            match self.eval_stmt(body)? {
                Flow::Break => break,
                Flow::Continue | Flow::Normal => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
            if let Some(update) = update {
                self.eval_expr(update)?;
            }
        }
        Ok(Flow::Normal)
    }

    // ── Expressions ─────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, Interrupt> {
        self.tick()?;
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TplExpr::Lit(s) => out.push_str(s),
                        TplExpr::Sub(expr) => {
                            let v = self.eval_expr(expr)?;
                            out.push_str(&display(&v));
                        }
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Ident(name) => self
                .lookup(name)
                .ok_or_else(|| Interrupt::Error(format!("'{name}' is not defined"))),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
            Expr::Object(props) => {
                let mut map = HashMap::new();
                for (key, expr) in props {
                    let v = self.eval_expr(expr)?;
                    map.insert(key.clone(), v);
                }
                Ok(Value::Object(Rc::new(RefCell::new(map))))
            }
            Expr::Unary { op, expr } => {
                let v = self.eval_expr(expr)?;
                match op {
                    UnOp::Not => Ok(Value::Bool(!truthy(&v))),
                    UnOp::Neg => {
                        let n = to_number(&v).ok_or_else(|| {
                            Interrupt::Error(format!("cannot negate {}", type_name(&v)))
                        })?;
                        Ok(Value::Num(-n))
                    }
                    UnOp::Pos => {
                        let n = to_number(&v).ok_or_else(|| {
                            Interrupt::Error(format!("cannot coerce {} to number", type_name(&v)))
                        })?;
                        Ok(Value::Num(n))
                    }
                }
            }
            Expr::Update {
                inc,
                prefix,
                target,
            } => {
                let old = self.eval_expr(target)?;
                let old = to_number(&old).ok_or_else(|| {
                    Interrupt::Error(format!("cannot increment {}", type_name(&old)))
                })?;
                let new = if *inc { old + 1.0 } else { old - 1.0 };
                self.set_target(target, Value::Num(new))?;
                Ok(Value::Num(if *prefix { new } else { old }))
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval_expr(lhs)?;
                let b = self.eval_expr(rhs)?;
                binary(*op, &a, &b)
            }
            Expr::Logical { and, lhs, rhs } => {
                let a = self.eval_expr(lhs)?;
                if *and {
                    if truthy(&a) {
                        self.eval_expr(rhs)
                    } else {
                        Ok(a)
                    }
                } else if truthy(&a) {
                    Ok(a)
                } else {
                    self.eval_expr(rhs)
                }
            }
            Expr::Ternary { cond, then, alt } => {
                if truthy(&self.eval_expr(cond)?) {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(alt)
                }
            }
            Expr::Assign { op, target, value } => {
                let value = match op {
                    None => self.eval_expr(value)?,
                    Some(op) => {
                        let current = self.eval_expr(target)?;
                        let rhs = self.eval_expr(value)?;
                        binary(*op, &current, &rhs)?
                    }
                };
                self.set_target(target, value.clone())?;
                Ok(value)
            }
            Expr::New { ctor, args } => self.eval_new(ctor, args),
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Member { obj, prop } => {
                let obj = self.eval_expr(obj)?;
                self.get_member(&obj, prop)
            }
            Expr::Index { obj, index } => {
                let obj = self.eval_expr(obj)?;
                let index = self.eval_expr(index)?;
                self.get_index(&obj, &index)
            }
        }
    }

    /// The constructor allow-list: only the builder can be constructed.
    fn eval_new(&mut self, ctor: &str, args: &[Expr]) -> Result<Value, Interrupt> {
        if ctor != "LDrawBuilder" {
            return Err(Interrupt::Error(format!(
                "'{ctor}' is not an available constructor"
            )));
        }
        let builder = match args.first() {
            Some(expr) => {
                let v = self.eval_expr(expr)?;
                LdrawBuilder::new(display(&v))
            }
            None => LdrawBuilder::default(),
        };
        Ok(Value::Builder(Rc::new(RefCell::new(builder))))
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, Interrupt> {
        if let Expr::Member { obj, prop } = callee {
            let recv = self.eval_expr(obj)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg)?);
            }
            return self.call_method(&recv, prop, values);
        }

        let func = self.eval_expr(callee)?;
        match func {
            Value::Func(def) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                self.call_function(&def, values)
            }
            other => Err(Interrupt::Error(format!(
                "{} is not a function",
                type_name(&other)
            ))),
        }
    }

    fn call_function(&mut self, def: &FuncDef, args: Vec<Value>) -> Result<Value, Interrupt> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Interrupt::Error("maximum call depth exceeded".to_string()));
        }
        self.depth += 1;

        // Functions see globals plus their own frame — no closures.
        let saved = std::mem::take(&mut self.locals);
        let mut frame = HashMap::new();
        for (i, param) in def.params.iter().enumerate() {
            frame.insert(
                param.clone(),
                args.get(i).cloned().unwrap_or(Value::Undefined),
            );
        }
        self.locals.push(frame);

        let result = self.eval_block_body(&def.body);

        self.locals = saved;
        self.depth -= 1;

        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Undefined),
        }
    }

    // ── Method dispatch ─────────────────────────────────

    fn call_method(
        &mut self,
        recv: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        match recv {
            Value::Builder(rc) => self.builder_method(rc, method, args),
            Value::Native(NativeObj::Console) => self.console_method(method, args),
            Value::Native(NativeObj::Math) => self.math_method(method, args),
            Value::Array(rc) => array_method(rc, method, args),
            Value::Str(s) => string_method(s, method, args),
            other => Err(Interrupt::Error(format!(
                "{} has no method '{method}'",
                type_name(other)
            ))),
        }
    }

    fn builder_method(
        &mut self,
        rc: &Rc<RefCell<LdrawBuilder>>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        let chained = Value::Builder(rc.clone());
        match method {
            "addPart" => {
                let part = str_arg(&args, 0, method)?;
                let color = num_arg(&args, 1, method)? as u32;
                let x = num_arg(&args, 2, method)? as f32;
                let y = num_arg(&args, 3, method)? as f32;
                let z = num_arg(&args, 4, method)? as f32;
                // Optional orientation cells; missing ones fall back to identity.
                let mut matrix = IDENTITY;
                for (i, cell) in matrix.iter_mut().enumerate() {
                    if args.len() > 5 + i {
                        *cell = num_arg(&args, 5 + i, method)? as f32;
                    }
                }
                rc.borrow_mut().add_part_with_matrix(&part, color, x, y, z, matrix);
                Ok(chained)
            }
            "addBrick" | "addPlate" => {
                let part = str_arg(&args, 0, method)?;
                let color = num_arg(&args, 1, method)? as u32;
                let x = num_arg(&args, 2, method)? as f32;
                let y = num_arg(&args, 3, method)? as f32;
                let z = num_arg(&args, 4, method)? as f32;
                rc.borrow_mut().add_part(&part, color, x, y, z);
                Ok(chained)
            }
            "addWheel" => {
                let part = str_arg(&args, 0, method)?;
                let x = num_arg(&args, 1, method)? as f32;
                let y = num_arg(&args, 2, method)? as f32;
                let z = num_arg(&args, 3, method)? as f32;
                rc.borrow_mut().add_wheel(&part, x, y, z);
                Ok(chained)
            }
            "addPartRotatedY90" => {
                let part = str_arg(&args, 0, method)?;
                let color = num_arg(&args, 1, method)? as u32;
                let x = num_arg(&args, 2, method)? as f32;
                let y = num_arg(&args, 3, method)? as f32;
                let z = num_arg(&args, 4, method)? as f32;
                rc.borrow_mut().add_part_rotated_y90(&part, color, x, y, z);
                Ok(chained)
            }
            "addPartRotatedX90" => {
                let part = str_arg(&args, 0, method)?;
                let color = num_arg(&args, 1, method)? as u32;
                let x = num_arg(&args, 2, method)? as f32;
                let y = num_arg(&args, 3, method)? as f32;
                let z = num_arg(&args, 4, method)? as f32;
                rc.borrow_mut().add_part_rotated_x90(&part, color, x, y, z);
                Ok(chained)
            }
            "addStep" => {
                rc.borrow_mut().add_step();
                Ok(chained)
            }
            "setModelName" => {
                let name = str_arg(&args, 0, method)?;
                rc.borrow_mut().set_model_name(name);
                Ok(chained)
            }
            "setAuthor" => {
                let author = str_arg(&args, 0, method)?;
                rc.borrow_mut().set_author(author);
                Ok(chained)
            }
            "setColor" => {
                let color = num_arg(&args, 0, method)? as u32;
                rc.borrow_mut().set_color(color);
                Ok(chained)
            }
            "clear" => {
                rc.borrow_mut().clear();
                Ok(chained)
            }
            "getPartCount" => Ok(Value::Num(rc.borrow().part_count() as f64)),
            "getContent" => Ok(Value::Str(rc.borrow().to_ldraw())),
            // Inside the sandbox, save captures the render instead of
            // writing to disk. The filename argument is ignored.
            "save" => {
                let b = rc.borrow();
                self.captured = Some(Captured {
                    content: b.to_ldraw(),
                    part_count: b.part_count(),
                });
                Ok(Value::Undefined)
            }
            other => Err(Interrupt::Error(format!(
                "builder has no method '{other}'"
            ))),
        }
    }

    fn console_method(&mut self, method: &str, args: Vec<Value>) -> Result<Value, Interrupt> {
        match method {
            "log" | "info" | "warn" | "error" => {
                let line = args
                    .iter()
                    .map(display)
                    .collect::<Vec<_>>()
                    .join(" ");
                if method == "warn" || method == "error" {
                    warn!("[generated] {line}");
                } else {
                    info!("[generated] {line}");
                }
                self.logs.push(line);
                Ok(Value::Undefined)
            }
            other => Err(Interrupt::Error(format!(
                "console has no method '{other}'"
            ))),
        }
    }

    fn math_method(&mut self, method: &str, args: Vec<Value>) -> Result<Value, Interrupt> {
        let unary = |i: usize| num_arg(&args, i, method);
        let n = match method {
            "floor" => unary(0)?.floor(),
            "ceil" => unary(0)?.ceil(),
            "round" => unary(0)?.round(),
            "abs" => unary(0)?.abs(),
            "sqrt" => unary(0)?.sqrt(),
            "sin" => unary(0)?.sin(),
            "cos" => unary(0)?.cos(),
            "pow" => unary(0)?.powf(unary(1)?),
            "min" | "max" => {
                let mut acc = if method == "min" {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                };
                for i in 0..args.len() {
                    let v = unary(i)?;
                    acc = if method == "min" { acc.min(v) } else { acc.max(v) };
                }
                acc
            }
            // Deterministic per run — the sandbox has no entropy source.
            "random" => {
                self.rand_state ^= self.rand_state << 13;
                self.rand_state ^= self.rand_state >> 7;
                self.rand_state ^= self.rand_state << 17;
                (self.rand_state >> 11) as f64 / (1u64 << 53) as f64
            }
            other => {
                return Err(Interrupt::Error(format!("Math has no method '{other}'")))
            }
        };
        Ok(Value::Num(n))
    }

    // ── Property access ─────────────────────────────────

    fn get_member(&mut self, obj: &Value, prop: &str) -> Result<Value, Interrupt> {
        match obj {
            Value::Object(rc) => Ok(rc.borrow().get(prop).cloned().unwrap_or(Value::Undefined)),
            Value::Array(rc) if prop == "length" => Ok(Value::Num(rc.borrow().len() as f64)),
            Value::Str(s) if prop == "length" => Ok(Value::Num(s.chars().count() as f64)),
            Value::Native(NativeObj::Math) => match prop {
                "PI" => Ok(Value::Num(std::f64::consts::PI)),
                "E" => Ok(Value::Num(std::f64::consts::E)),
                other => Err(Interrupt::Error(format!("Math has no property '{other}'"))),
            },
            other => Err(Interrupt::Error(format!(
                "{} has no property '{prop}'",
                type_name(other)
            ))),
        }
    }

    fn get_index(&mut self, obj: &Value, index: &Value) -> Result<Value, Interrupt> {
        match obj {
            Value::Array(rc) => {
                let i = to_number(index).ok_or_else(|| {
                    Interrupt::Error("array index must be a number".to_string())
                })? as usize;
                Ok(rc.borrow().get(i).cloned().unwrap_or(Value::Undefined))
            }
            Value::Object(rc) => {
                let key = display(index);
                Ok(rc.borrow().get(&key).cloned().unwrap_or(Value::Undefined))
            }
            Value::Str(s) => {
                let i = to_number(index).ok_or_else(|| {
                    Interrupt::Error("string index must be a number".to_string())
                })? as usize;
                Ok(s.chars()
                    .nth(i)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Undefined))
            }
            other => Err(Interrupt::Error(format!(
                "{} is not indexable",
                type_name(other)
            ))),
        }
    }

    fn set_target(&mut self, target: &Expr, value: Value) -> Result<(), Interrupt> {
        match target {
            Expr::Ident(name) => {
                self.assign_var(name, value);
                Ok(())
            }
            Expr::Member { obj, prop } => {
                let obj = self.eval_expr(obj)?;
                match obj {
                    Value::Object(rc) => {
                        rc.borrow_mut().insert(prop.clone(), value);
                        Ok(())
                    }
                    other => Err(Interrupt::Error(format!(
                        "cannot set property '{prop}' on {}",
                        type_name(&other)
                    ))),
                }
            }
            Expr::Index { obj, index } => {
                let obj = self.eval_expr(obj)?;
                let index = self.eval_expr(index)?;
                match obj {
                    Value::Array(rc) => {
                        let i = to_number(&index).ok_or_else(|| {
                            Interrupt::Error("array index must be a number".to_string())
                        })? as usize;
                        let mut items = rc.borrow_mut();
                        if i >= items.len() {
                            items.resize(i + 1, Value::Undefined);
                        }
                        items[i] = value;
                        Ok(())
                    }
                    Value::Object(rc) => {
                        rc.borrow_mut().insert(display(&index), value);
                        Ok(())
                    }
                    other => Err(Interrupt::Error(format!(
                        "{} is not indexable",
                        type_name(&other)
                    ))),
                }
            }
            _ => Err(Interrupt::Error("invalid assignment target".to_string())),
        }
    }
}

// ── Free helpers ────────────────────────────────────────

fn array_method(
    rc: &Rc<RefCell<Vec<Value>>>,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    match method {
        "push" => {
            let mut items = rc.borrow_mut();
            for arg in args {
                items.push(arg);
            }
            Ok(Value::Num(items.len() as f64))
        }
        "pop" => Ok(rc.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "join" => {
            let sep = match args.first() {
                Some(v) => display(v),
                None => ",".to_string(),
            };
            let joined = rc
                .borrow()
                .iter()
                .map(display)
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::Str(joined))
        }
        other => Err(Interrupt::Error(format!("array has no method '{other}'"))),
    }
}

fn string_method(s: &str, method: &str, args: Vec<Value>) -> Result<Value, Interrupt> {
    match method {
        "toUpperCase" => Ok(Value::Str(s.to_uppercase())),
        "toLowerCase" => Ok(Value::Str(s.to_lowercase())),
        "repeat" => {
            let n = num_arg(&args, 0, method)?.max(0.0) as usize;
            Ok(Value::Str(s.repeat(n)))
        }
        other => Err(Interrupt::Error(format!("string has no method '{other}'"))),
    }
}

fn str_arg(args: &[Value], i: usize, method: &str) -> Result<String, Interrupt> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.clone()),
        // Part numbers sometimes arrive as bare numbers; accept them.
        Some(Value::Num(n)) => Ok(format_number(*n)),
        Some(other) => Err(Interrupt::Error(format!(
            "{method}: argument {} must be a string, got {}",
            i + 1,
            type_name(other)
        ))),
        None => Err(Interrupt::Error(format!(
            "{method}: missing argument {}",
            i + 1
        ))),
    }
}

fn num_arg(args: &[Value], i: usize, method: &str) -> Result<f64, Interrupt> {
    match args.get(i) {
        Some(v) => to_number(v).ok_or_else(|| {
            Interrupt::Error(format!(
                "{method}: argument {} must be a number, got {}",
                i + 1,
                type_name(v)
            ))
        }),
        None => Err(Interrupt::Error(format!(
            "{method}: missing argument {}",
            i + 1
        ))),
    }
}

fn binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, Interrupt> {
    match op {
        BinOp::Add => match (a, b) {
            (Value::Num(x), Value::Num(y)) => Ok(Value::Num(x + y)),
            _ if matches!(a, Value::Str(_)) || matches!(b, Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", display(a), display(b))))
            }
            _ => numeric(op, a, b),
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => numeric(op, a, b),
        BinOp::Eq => Ok(Value::Bool(loose_eq(a, b))),
        BinOp::Ne => Ok(Value::Bool(!loose_eq(a, b))),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            if let (Value::Str(x), Value::Str(y)) = (a, b) {
                return Ok(Value::Bool(match op {
                    BinOp::Lt => x < y,
                    BinOp::Gt => x > y,
                    BinOp::Le => x <= y,
                    _ => x >= y,
                }));
            }
            match (to_number(a), to_number(b)) {
                (Some(x), Some(y)) => Ok(Value::Bool(match op {
                    BinOp::Lt => x < y,
                    BinOp::Gt => x > y,
                    BinOp::Le => x <= y,
                    _ => x >= y,
                })),
                // NaN-ish comparison: always false, like JS
                _ => Ok(Value::Bool(false)),
            }
        }
    }
}

fn numeric(op: BinOp, a: &Value, b: &Value) -> Result<Value, Interrupt> {
    let (x, y) = match (to_number(a), to_number(b)) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(Interrupt::Error(format!(
                "cannot apply arithmetic to {} and {}",
                type_name(a),
                type_name(b)
            )))
        }
    };
    let n = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::Rem => x % y,
        _ => unreachable!(),
    };
    Ok(Value::Num(n))
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Builder(x), Value::Builder(y)) => Rc::ptr_eq(x, y),
        (Value::Num(_), Value::Str(_)) | (Value::Str(_), Value::Num(_)) => {
            match (to_number(a), to_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Bool(_), Value::Num(_)) | (Value::Num(_), Value::Bool(_)) => {
            match (to_number(a), to_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => false,
    }
}

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Num(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        Value::Null | Value::Undefined => false,
        _ => true,
    }
}

fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Num(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Str(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    format!("{n}")
}

pub fn display(v: &Value) -> String {
    match v {
        Value::Num(n) => format_number(*n),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Undefined => "undefined".to_string(),
        Value::Array(rc) => rc
            .borrow()
            .iter()
            .map(display)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Func(_) => "[function]".to_string(),
        Value::Builder(_) => "[LDrawBuilder]".to_string(),
        Value::Native(NativeObj::Console) => "[console]".to_string(),
        Value::Native(NativeObj::Math) => "[Math]".to_string(),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Num(_) => "a number",
        Value::Str(_) => "a string",
        Value::Bool(_) => "a boolean",
        Value::Null => "null",
        Value::Undefined => "undefined",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
        Value::Func(_) => "a function",
        Value::Builder(_) => "a builder",
        Value::Native(_) => "a host object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::parser::parse;
    use std::time::Duration;

    fn run(src: &str) -> Result<Interp, Interrupt> {
        let program = parse(src).map_err(Interrupt::Error)?;
        let mut interp = Interp::new(Instant::now() + Duration::from_secs(5));
        interp.run(&program)?;
        Ok(interp)
    }

    fn run_and_capture(src: &str) -> Captured {
        let mut interp = run(src).unwrap();
        assert!(interp.capture_builder_output());
        interp.take_captured().unwrap()
    }

    // ── Builder interaction ─────────────────────────────

    #[test]
    fn test_basic_build() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('Tower');\n\
             builder.addPart('3001', Colors.RED, 0, 0, 0);\n\
             builder.addPart('3001', Colors.RED, 0, -24, 0);",
        );
        assert_eq!(captured.part_count, 2);
        assert!(captured.content.contains("0 Tower"));
        assert!(captured.content.contains("1 4 0 0 0 1 0 0 0 1 0 0 0 1 3001.dat"));
    }

    #[test]
    fn test_chained_builder_calls() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('Chain');\n\
             builder.addBrick('3001', 4, 0, 0, 0).addStep().addPlate('3020', 1, 0, -8, 0);",
        );
        assert_eq!(captured.part_count, 2);
        assert!(captured.content.contains("0 STEP"));
    }

    #[test]
    fn test_for_loop_places_parts() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('Wall');\n\
             for (let i = 0; i < 4; i++) {\n\
               builder.addPart('3001', 4, i * 20, 0, 0);\n\
             }",
        );
        assert_eq!(captured.part_count, 4);
        assert!(captured.content.contains("1 4 60 0 0"));
    }

    #[test]
    fn test_for_of_over_array() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('Row');\n\
             const xs = [0, 20, 40];\n\
             for (const x of xs) { builder.addPart('3001', 2, x, 0, 0); }",
        );
        assert_eq!(captured.part_count, 3);
    }

    #[test]
    fn test_user_function() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('Func');\n\
             function column(x, height) {\n\
               for (let i = 0; i < height; i++) {\n\
                 builder.addPart('3005', 14, x, 0 - i * 24, 0);\n\
               }\n\
             }\n\
             column(0, 3);\n\
             column(20, 2);",
        );
        assert_eq!(captured.part_count, 5);
    }

    #[test]
    fn test_explicit_matrix_args() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('M');\n\
             builder.addPart('4315', 0, 0, 0, -90, 1,0,0, 0,1,0, 0,0,1);",
        );
        assert!(captured.content.contains("1 0 0 0 -90 1 0 0 0 1 0 0 0 1 4315.dat"));
    }

    #[test]
    fn test_rotated_helper() {
        let captured = run_and_capture(
            "const builder = new LDrawBuilder('R');\n\
             builder.addPartRotatedY90('3001', 4, 10, 0, 5);",
        );
        assert!(captured.content.contains("1 4 10 0 5 0 0 -1 0 1 0 1 0 0 3001.dat"));
    }

    #[test]
    fn test_save_captures_without_guard() {
        let mut interp = run(
            "const b = new LDrawBuilder('X');\n\
             b.addPart('3001', 4, 0, 0, 0);\n\
             b.save('out');",
        )
        .unwrap();
        let captured = interp.take_captured().unwrap();
        assert_eq!(captured.part_count, 1);
    }

    #[test]
    fn test_guard_requires_builder_binding() {
        let mut interp = run("const other = new LDrawBuilder('X');").unwrap();
        assert!(!interp.capture_builder_output());
    }

    #[test]
    fn test_get_part_count_visible_to_script() {
        let interp = run(
            "const builder = new LDrawBuilder('C');\n\
             builder.addPart('3001', 4, 0, 0, 0);\n\
             console.log('count:', builder.getPartCount());",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["count: 1"]);
    }

    // ── Language semantics ──────────────────────────────

    #[test]
    fn test_template_strings() {
        let interp = run("let i = 2; console.log(`row ${i + 1} of ${3}`);").unwrap();
        assert_eq!(interp.logs, vec!["row 3 of 3"]);
    }

    #[test]
    fn test_ternary_and_modulo() {
        let interp = run(
            "for (let i = 0; i < 4; i++) { console.log(i % 2 == 0 ? 'even' : 'odd'); }",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["even", "odd", "even", "odd"]);
    }

    #[test]
    fn test_array_push_and_length() {
        let interp = run(
            "const xs = [];\n\
             xs.push(1); xs.push(2, 3);\n\
             console.log(xs.length, xs.join('-'));",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["3 1-2-3"]);
    }

    #[test]
    fn test_object_literal_access() {
        let interp = run(
            "const pos = {x: 10, y: -8};\n\
             console.log(pos.x + pos.y);",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["2"]);
    }

    #[test]
    fn test_math_namespace() {
        let interp = run("console.log(Math.floor(3.7), Math.max(1, 5, 2));").unwrap();
        assert_eq!(interp.logs, vec!["3 5"]);
    }

    #[test]
    fn test_colors_table() {
        let interp = run("console.log(Colors.RED, Colors.BLACK, Colors.TRANS_CLEAR);").unwrap();
        assert_eq!(interp.logs, vec!["4 0 47"]);
    }

    #[test]
    fn test_while_loop_with_break() {
        let interp = run(
            "let i = 0;\n\
             while (true) { i++; if (i >= 3) { break; } }\n\
             console.log(i);",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["3"]);
    }

    #[test]
    fn test_block_scoping() {
        let interp = run(
            "let x = 1;\n\
             { let x = 2; console.log(x); }\n\
             console.log(x);",
        )
        .unwrap();
        assert_eq!(interp.logs, vec!["2", "1"]);
    }

    // ── Failures ────────────────────────────────────────

    #[test]
    fn test_unknown_identifier_is_error() {
        let err = run("builder.addPart('3001', 4, 0, 0, 0);").unwrap_err();
        assert!(matches!(err, Interrupt::Error(msg) if msg.contains("'builder' is not defined")));
    }

    #[test]
    fn test_unknown_constructor_rejected() {
        let err = run("const x = new XMLHttpRequest();").unwrap_err();
        assert!(matches!(err, Interrupt::Error(msg) if msg.contains("not an available")));
    }

    #[test]
    fn test_unknown_builder_method() {
        let err = run("const b = new LDrawBuilder(); b.explode();").unwrap_err();
        assert!(matches!(err, Interrupt::Error(msg) if msg.contains("explode")));
    }

    #[test]
    fn test_throw_surfaces_message() {
        let err = run("throw 'custom failure'").unwrap_err();
        assert_eq!(err, Interrupt::Error("custom failure".to_string()));
    }

    #[test]
    fn test_recursion_depth_limited() {
        let err = run("function f() { f(); } f();").unwrap_err();
        assert!(matches!(err, Interrupt::Error(msg) if msg.contains("call depth")));
    }

    #[test]
    fn test_infinite_loop_times_out() {
        let program = parse("while (true) { let x = 1; }").unwrap();
        let mut interp = Interp::new(Instant::now() + Duration::from_millis(50));
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err, Interrupt::Timeout);
    }

    #[test]
    fn test_tight_infinite_loop_times_out() {
        // No body at all — the loop's own tick must catch it.
        let program = parse("for (;;) {}").unwrap();
        let mut interp = Interp::new(Instant::now() + Duration::from_millis(50));
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err, Interrupt::Timeout);
    }
}
