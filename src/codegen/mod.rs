//! Lowering of Culebra programs to textual LLVM IR.
//!
//! Emission happens in two phases: the type propagation pass in `types`
//! resolves one concrete LLVM type for every expression, then the emitter
//! walks the AST a second time producing the module text. Every local lives
//! in an `alloca` in its function's entry block, so the output is trivially
//! SSA-convertible by mem2reg.

mod expression;
pub mod runtime;
mod statement;
mod types;

pub use types::{check, FnSig, IrType, ProgramTypes};

use std::collections::HashMap;

use log::debug;

use crate::error::Result;
use crate::parser::ast::{Program, Statement};

pub fn emit(program: &Program) -> Result<String> {
    let types = types::check(program)?;
    Emitter::new(types).emit_module(program)
}

pub(crate) struct Emitter {
    types: ProgramTypes,
    /// Name of the function being emitted; "main" for top-level statements.
    scope: String,
    body: String,
    strings: Vec<String>,
    string_ids: HashMap<String, usize>,
    tmp: usize,
    label: usize,
    current_block: String,
    terminated: bool,
}

impl Emitter {
    fn new(types: ProgramTypes) -> Self {
        Self {
            types,
            scope: String::new(),
            body: String::new(),
            strings: vec![],
            string_ids: HashMap::new(),
            tmp: 0,
            label: 0,
            current_block: String::new(),
            terminated: false,
        }
    }

    fn emit_module(mut self, program: &Program) -> Result<String> {
        debug!("emitting LLVM IR module");

        let mut functions = String::new();
        for statement in &program.statements {
            if let Statement::FunctionDef {
                name, params, body, ..
            } = statement
            {
                functions.push_str(&self.emit_function(name, params, body)?);
                functions.push('\n');
            }
        }

        let main = self.emit_main(program)?;

        let mut module = String::new();
        module.push_str("; ModuleID = 'culebra'\n\n");
        module.push_str("%array = type { i64, i8* }\n\n");
        module.push_str(&runtime::declarations());
        module.push('\n');
        for constant in &self.strings {
            module.push_str(constant);
            module.push('\n');
        }
        if !self.strings.is_empty() {
            module.push('\n');
        }
        module.push_str(&functions);
        module.push_str(&main);

        Ok(module)
    }

    fn emit_function(
        &mut self,
        name: &str,
        params: &[String],
        body: &crate::parser::ast::Block,
    ) -> Result<String> {
        let sig: FnSig = self.types.functions[name].clone();

        self.begin_scope(name);

        let param_list = params
            .iter()
            .zip(&sig.params)
            .map(|(param, ty)| format!("{} %{param}", ty.llvm()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = format!("define {} @{name}({param_list}) {{\n", sig.ret.llvm());

        self.emit_allocas();
        for (param, ty) in params.iter().zip(&sig.params) {
            self.store_raw_param(param, ty.clone());
        }

        for statement in body {
            if self.terminated {
                break;
            }
            self.emit_stmt(statement)?;
        }

        if !self.terminated {
            self.line(&default_return(&sig.ret));
        }

        out.push_str(&self.body);
        out.push_str("}\n");

        Ok(out)
    }

    fn emit_main(&mut self, program: &Program) -> Result<String> {
        self.begin_scope("main");

        let mut out = String::from("define i32 @main() {\n");

        self.emit_allocas();

        for statement in &program.statements {
            if matches!(statement, Statement::FunctionDef { .. }) {
                continue;
            }
            if self.terminated {
                break;
            }
            self.emit_stmt(statement)?;
        }

        if !self.terminated {
            self.line("ret i32 0");
        }

        out.push_str(&self.body);
        out.push_str("}\n");

        Ok(out)
    }

    fn begin_scope(&mut self, name: &str) {
        self.scope = name.to_owned();
        self.body = String::from("entry:\n");
        self.tmp = 0;
        self.label = 0;
        self.current_block = "entry".to_owned();
        self.terminated = false;
    }

    /// One alloca per local (parameters included), all in the entry block.
    fn emit_allocas(&mut self) {
        let locals: Vec<(String, IrType)> = self.types.locals[&self.scope]
            .iter()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();

        for (name, ty) in locals {
            let storage = storage_type(&ty);
            self.line(&format!("%{name}.addr = alloca {storage}"));
        }
    }

    fn store_raw_param(&mut self, param: &str, ty: IrType) {
        if ty == IrType::Bool {
            let widened = self.fresh();
            self.line(&format!("{widened} = zext i1 %{param} to i8"));
            self.line(&format!("store i8 {widened}, i8* %{param}.addr"));
        } else {
            let ll = ty.llvm();
            self.line(&format!("store {ll} %{param}, {ll}* %{param}.addr"));
        }
    }

    // ------------------------------------------------------------------
    // buffer plumbing shared by the statement and expression lowerings
    // ------------------------------------------------------------------

    pub(crate) fn line(&mut self, text: &str) {
        if self.terminated {
            return;
        }
        self.body.push_str("  ");
        self.body.push_str(text);
        self.body.push('\n');
    }

    pub(crate) fn fresh(&mut self) -> String {
        let id = self.tmp;
        self.tmp += 1;
        format!("%t{id}")
    }

    pub(crate) fn next_label(&mut self) -> usize {
        let id = self.label;
        self.label += 1;
        id
    }

    pub(crate) fn start_block(&mut self, label: &str) {
        self.body.push_str(label);
        self.body.push_str(":\n");
        self.current_block = label.to_owned();
        self.terminated = false;
    }

    /// Branch to `label` unless the current block already ended.
    pub(crate) fn branch_to(&mut self, label: &str) {
        if !self.terminated {
            self.line(&format!("br label %{label}"));
            self.terminated = true;
        }
    }

    pub(crate) fn var_type(&self, name: &str) -> IrType {
        self.types.locals[&self.scope][name].clone()
    }

    pub(crate) fn signature(&self, name: &str) -> Option<&FnSig> {
        self.types.functions.get(name)
    }

    /// Intern a string literal as a private global and return an inline
    /// `getelementptr` i8* for it.
    pub(crate) fn string_constant(&mut self, value: &str) -> String {
        let id = match self.string_ids.get(value) {
            Some(id) => *id,
            None => {
                let id = self.strings.len();
                let length = value.len() + 1;
                self.strings.push(format!(
                    "@.str.{id} = private unnamed_addr constant [{length} x i8] c\"{}\\00\"",
                    escape_bytes(value.as_bytes())
                ));
                self.string_ids.insert(value.to_owned(), id);
                id
            }
        };

        let length = value.len() + 1;
        format!("getelementptr inbounds ([{length} x i8], [{length} x i8]* @.str.{id}, i64 0, i64 0)")
    }
}

/// How a type is stored in an alloca; i1 widens to i8 in memory.
pub(crate) fn storage_type(ty: &IrType) -> &'static str {
    if *ty == IrType::Bool {
        "i8"
    } else {
        ty.llvm()
    }
}

fn default_return(ret: &IrType) -> String {
    match ret {
        IrType::Void => "ret void".to_owned(),
        IrType::Int => "ret i64 0".to_owned(),
        IrType::Float => "ret double 0x0000000000000000".to_owned(),
        IrType::Bool => "ret i1 false".to_owned(),
        IrType::Str => "ret i8* null".to_owned(),
        IrType::Array(_) => "ret %array* null".to_owned(),
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    for byte in bytes {
        match byte {
            0x20..=0x7E if *byte != b'"' && *byte != b'\\' => out.push(*byte as char),
            _ => out.push_str(&format!("\\{byte:02X}")),
        }
    }
    out
}
