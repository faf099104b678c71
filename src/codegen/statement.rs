//! Statement lowering: control flow becomes labeled basic blocks with
//! explicit branches, assignments become stores.

use crate::error::{Error, Result};
use crate::parser::ast::{Block, Expression, IfBranch, Statement};

use super::types::IrType;
use super::Emitter;

impl Emitter {
    pub(crate) fn emit_stmt(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression { expr, .. } => {
                self.emit_expr(expr)?;
                Ok(())
            }
            Statement::Assignment { target, value, .. } => self.emit_assignment(target, value),
            Statement::If {
                branches,
                else_body,
                ..
            } => self.emit_if(branches, else_body.as_ref()),
            Statement::While {
                condition, body, ..
            } => self.emit_while(condition, body),
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => self.emit_for(init, condition, step, body),
            // top-level definitions get their own `define`; nested ones were
            // rejected during type propagation
            Statement::FunctionDef { .. } => Ok(()),
            Statement::Return { value, .. } => {
                match value {
                    Some(expr) => {
                        let operand = self.emit_expr(expr)?;
                        if operand.ty == IrType::Void {
                            self.line("ret void");
                        } else {
                            self.line(&format!("ret {} {}", operand.ty.llvm(), operand.repr));
                        }
                    }
                    None => self.line("ret void"),
                }
                self.terminated = true;
                Ok(())
            }
        }
    }

    pub(crate) fn emit_block(&mut self, block: &Block) -> Result<()> {
        for statement in block {
            if self.terminated {
                break;
            }
            self.emit_stmt(statement)?;
        }
        Ok(())
    }

    fn emit_assignment(&mut self, target: &Expression, value: &Expression) -> Result<()> {
        match target {
            Expression::Identifier { name, .. } => {
                let operand = self.emit_expr(value)?;
                self.store_var(name, operand);
                Ok(())
            }
            Expression::Grouping { expr, .. } => self.emit_assignment(expr, value),
            Expression::Index { object, index, .. } => {
                let array = self.emit_expr(object)?;
                let index = self.emit_expr(index)?;
                let operand = self.emit_expr(value)?;
                let cell = self.to_cell(operand);
                self.line(&format!(
                    "call void @culebra_array_set(%array* {}, i64 {}, i64 {cell})",
                    array.repr, index.repr
                ));
                Ok(())
            }
            other => Err(Error::compile(other.position(), "invalid assignment target")),
        }
    }

    fn emit_if(&mut self, branches: &[IfBranch], else_body: Option<&Block>) -> Result<()> {
        let n = self.next_label();
        let end = format!("if.end.{n}");

        self.emit_if_chain(branches, else_body, &end)?;
        self.start_block(&end);

        Ok(())
    }

    fn emit_if_chain(
        &mut self,
        branches: &[IfBranch],
        else_body: Option<&Block>,
        end: &str,
    ) -> Result<()> {
        let Some((first, rest)) = branches.split_first() else {
            if let Some(body) = else_body {
                self.emit_block(body)?;
            }
            self.branch_to(end);
            return Ok(());
        };

        let n = self.next_label();
        let then_label = format!("if.then.{n}");
        let else_label = if rest.is_empty() && else_body.is_none() {
            end.to_owned()
        } else {
            format!("if.else.{n}")
        };

        let condition = self.emit_condition(&first.condition)?;
        self.line(&format!(
            "br i1 {condition}, label %{then_label}, label %{else_label}"
        ));
        self.terminated = true;

        self.start_block(&then_label);
        self.emit_block(&first.body)?;
        self.branch_to(end);

        if else_label != end {
            self.start_block(&else_label);
            self.emit_if_chain(rest, else_body, end)?;
        }

        Ok(())
    }

    fn emit_while(&mut self, condition: &Expression, body: &Block) -> Result<()> {
        let n = self.next_label();
        let cond_label = format!("while.cond.{n}");
        let body_label = format!("while.body.{n}");
        let end_label = format!("while.end.{n}");

        self.branch_to(&cond_label);
        self.start_block(&cond_label);
        let condition = self.emit_condition(condition)?;
        self.line(&format!(
            "br i1 {condition}, label %{body_label}, label %{end_label}"
        ));
        self.terminated = true;

        self.start_block(&body_label);
        self.emit_block(body)?;
        self.branch_to(&cond_label);

        self.start_block(&end_label);

        Ok(())
    }

    fn emit_for(
        &mut self,
        init: &Statement,
        condition: &Expression,
        step: &Statement,
        body: &Block,
    ) -> Result<()> {
        self.emit_stmt(init)?;

        let n = self.next_label();
        let cond_label = format!("for.cond.{n}");
        let body_label = format!("for.body.{n}");
        let step_label = format!("for.step.{n}");
        let end_label = format!("for.end.{n}");

        self.branch_to(&cond_label);
        self.start_block(&cond_label);
        let condition = self.emit_condition(condition)?;
        self.line(&format!(
            "br i1 {condition}, label %{body_label}, label %{end_label}"
        ));
        self.terminated = true;

        self.start_block(&body_label);
        self.emit_block(body)?;
        self.branch_to(&step_label);

        self.start_block(&step_label);
        self.emit_stmt(step)?;
        self.branch_to(&cond_label);

        self.start_block(&end_label);

        Ok(())
    }

    pub(crate) fn store_var(&mut self, name: &str, operand: super::expression::Operand) {
        if operand.ty == IrType::Bool {
            let widened = self.fresh();
            self.line(&format!("{widened} = zext i1 {} to i8", operand.repr));
            self.line(&format!("store i8 {widened}, i8* %{name}.addr"));
        } else {
            let ll = operand.ty.llvm();
            self.line(&format!("store {ll} {}, {ll}* %{name}.addr", operand.repr));
        }
    }
}
