//! Block lowering (§4.5): the single recursive descent from the program
//! root that turns the standardized AST into a [`BlockStore`]. This is the
//! largest phase in the pipeline — it owns the fresh-id counter, the
//! statement table, the expression `encode` table, operator lowering with
//! negation wrapping, and capture-free inlining of non-recursive functions.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{AssignTarget, BinOp, Callee, Expr, FunctionBody, MemberKey, Program, Span, Stmt, UnaryOp};
use crate::blocks::{Block, BlockId, BlockStore, Field, Input, Mutation, NumShadow, Opcode, Operand, ShadowPayload, TextShadow, VariableReporter};
use crate::symbols::SymbolTable;

/// Result of lowering a whole program: the block store, plus the extra
/// `f_result`-style variables that materialize only because a recursive call
/// was encoded (§4.5.2's "also allocate a result-holding variable").
pub struct LoweredProgram {
    pub blocks: BlockStore,
    pub extra_variables: IndexSet<String>,
}

/// Runs the full lowering pass over `program` using the tables built by the
/// symbol analyzer.
pub fn lower(program: &Program, symbols: &SymbolTable) -> LoweredProgram {
    let mut lowerer = Lowerer {
        symbols,
        blocks: BlockStore::new(),
        next_id: 0,
        extra_variables: IndexSet::new(),
    };
    lowerer.lower_program(program);
    LoweredProgram {
        blocks: lowerer.blocks,
        extra_variables: lowerer.extra_variables,
    }
}

struct Lowerer<'a> {
    symbols: &'a SymbolTable,
    blocks: BlockStore,
    next_id: u64,
    extra_variables: IndexSet<String>,
}

impl<'a> Lowerer<'a> {
    fn reserve(&mut self) -> BlockId {
        let id = format!("b{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn finish(&mut self, id: BlockId, block: Block) {
        self.blocks.insert(id, block);
    }

    /// Creates a block that is always owned as an input/field value of
    /// `owner` (a reporter, never a statement in the `next` chain).
    fn emit_child(&mut self, owner: &BlockId, opcode: Opcode, build: impl FnOnce(Block) -> Block) -> BlockId {
        let id = self.reserve();
        let mut block = Block::new(opcode);
        block.parent = Some(owner.clone());
        let block = build(block);
        self.finish(id.clone(), block);
        id
    }

    fn chain_tail(&self, mut id: BlockId) -> BlockId {
        while let Some(next) = self.blocks.get(&id).and_then(|b| b.next.clone()) {
            id = next;
        }
        id
    }

    /// Top-level orchestration: the program's statements, prepended with the
    /// event root and appended with a stop-all block (§4.5.1 "program" row).
    fn lower_program(&mut self, program: &Program) {
        let root_id = self.reserve();
        let body_entry = self.lower_stmt_list(&program.body, Some(root_id.clone()));

        let stop_id = self.reserve();
        let stop_parent = body_entry.clone().map_or_else(|| root_id.clone(), |e| self.chain_tail(e));
        let mut stop_block = Block::new(Opcode::ControlStop)
            .with_field("STOP_OPTION", Field("all".to_string(), None))
            .with_mutation(Mutation::stop_all());
        stop_block.parent = Some(stop_parent.clone());
        self.finish(stop_id.clone(), stop_block);
        self.blocks.get_mut(&stop_parent).expect("just-created block").next = Some(stop_id.clone());

        let mut root_block = Block::new(Opcode::EventWhenFlagClicked);
        root_block.top_level = true;
        root_block.next = Some(body_entry.clone().unwrap_or_else(|| stop_id.clone()));
        self.finish(root_id.clone(), root_block);
        if let Some(entry) = &body_entry {
            self.blocks.get_mut(entry).expect("just-created block").parent = Some(root_id.clone());
        }
    }

    /// Lowers a statement list, chaining the resulting entries via
    /// `next`/`parent` and returning the id of the first one (§4.5.4).
    fn lower_stmt_list(&mut self, stmts: &[Stmt], parent: Option<BlockId>) -> Option<BlockId> {
        let mut entry = None;
        let mut prev: Option<BlockId> = None;
        for stmt in stmts {
            let Some(id) = self.lower_stmt(stmt) else { continue };
            let this_parent = prev.clone().or_else(|| parent.clone());
            self.blocks.get_mut(&id).expect("just-created block").parent = this_parent;
            if entry.is_none() {
                entry = Some(id.clone());
            }
            if let Some(p) = &prev {
                self.blocks.get_mut(p).expect("just-created block").next = Some(id.clone());
            }
            prev = Some(id);
        }
        entry
    }

    /// A statement's substack body: braces unwrap to their list, a bare
    /// statement becomes a one-element list.
    fn body_of(stmt: &Stmt) -> &[Stmt] {
        match stmt {
            Stmt::Block { body, .. } => body,
            other => std::slice::from_ref(other),
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Option<BlockId> {
        match stmt {
            Stmt::VarDecl { name, init, .. } => self.lower_var_decl(name, init.as_ref()),
            Stmt::Expr { expr, .. } => self.lower_expr_stmt(expr),
            Stmt::If { test, consequent, .. } => Some(self.lower_if(test, consequent)),
            Stmt::While { test, body, .. } => Some(self.lower_while(test, body)),
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => Some(self.lower_for(init.as_deref(), test.as_ref(), update.as_ref(), body)),
            Stmt::Block { body, .. } => self.lower_stmt_list(body, None),
            Stmt::FunctionDecl { name, params, body, .. } => {
                self.lower_function_decl(name, params, body);
                None
            }
            Stmt::Return { .. } | Stmt::Other { .. } => None,
        }
    }

    fn lower_var_decl(&mut self, name: &str, init: Option<&Expr>) -> Option<BlockId> {
        match init {
            Some(Expr::FunctionExpr { .. } | Expr::ArrayLiteral { .. } | Expr::ObjectLiteral { .. }) => None,
            _ => {
                let id = self.reserve();
                let value = match init {
                    Some(e) => self.encode(e, &id),
                    None => Input::LiteralShadow(ShadowPayload::Number(NumShadow("0".to_string()))),
                };
                let block =
                    Block::new(Opcode::DataSetVariableTo).with_field("VARIABLE", Field(name.to_string(), Some(name.to_string())));
                let block = block.with_input("VALUE", value);
                self.finish(id.clone(), block);
                Some(id)
            }
        }
    }

    fn lower_expr_stmt(&mut self, expr: &Expr) -> Option<BlockId> {
        match expr {
            Expr::Assign { target, value, .. } => self.lower_assignment_stmt(target, value),
            Expr::Call { callee, arguments, .. } => self.lower_call_stmt(callee, arguments),
            _ => None,
        }
    }

    fn lower_assignment_stmt(&mut self, target: &AssignTarget, value: &Expr) -> Option<BlockId> {
        match target {
            AssignTarget::Identifier(name) => {
                let id = self.reserve();
                let v = self.encode(value, &id);
                let block = Block::new(Opcode::DataSetVariableTo)
                    .with_field("VARIABLE", Field(name.clone(), Some(name.clone())))
                    .with_input("VALUE", v);
                self.finish(id.clone(), block);
                Some(id)
            }
            AssignTarget::Member { object, property } => {
                let Expr::Identifier { name: base, .. } = object else {
                    return None;
                };
                if self.symbols.lists.contains(base) {
                    let MemberKey::Computed(index) = property else {
                        return None;
                    };
                    let id = self.reserve();
                    let index_input = self.encode(index, &id);
                    let item_input = self.encode(value, &id);
                    let block = Block::new(Opcode::DataReplaceItemOfList)
                        .with_field("LIST", Field(base.clone(), Some(base.clone())))
                        .with_input("INDEX", index_input)
                        .with_input("ITEM", item_input);
                    self.finish(id.clone(), block);
                    Some(id)
                } else if self.symbols.object_mappings.contains_key(base) {
                    let prop = member_key_name(property)?;
                    let flattened = SymbolTable::flattened_name(base, &prop);
                    let id = self.reserve();
                    let v = self.encode(value, &id);
                    let block = Block::new(Opcode::DataSetVariableTo)
                        .with_field("VARIABLE", Field(flattened.clone(), Some(flattened)))
                        .with_input("VALUE", v);
                    self.finish(id.clone(), block);
                    Some(id)
                } else {
                    None
                }
            }
        }
    }

    fn lower_call_stmt(&mut self, callee: &Callee, args: &[Expr]) -> Option<BlockId> {
        match callee {
            Callee::Identifier(name) if name == "scratch_say" => {
                let id = self.reserve();
                let message = match args.first() {
                    Some(e) => self.encode(e, &id),
                    None => Input::LiteralShadow(ShadowPayload::Text(TextShadow(String::new()))),
                };
                let block = Block::new(Opcode::LooksSay).with_input("MESSAGE", message);
                self.finish(id.clone(), block);
                Some(id)
            }
            Callee::Identifier(_) => None,
            Callee::Member { object, property } => {
                let Expr::Identifier { name: arr, .. } = object else {
                    return None;
                };
                if !self.symbols.lists.contains(arr) {
                    return None;
                }
                match property.as_str() {
                    "push" => {
                        let id = self.reserve();
                        let item = match args.first() {
                            Some(e) => self.encode(e, &id),
                            None => Input::LiteralShadow(ShadowPayload::Number(NumShadow("0".to_string()))),
                        };
                        let block = Block::new(Opcode::DataAddToList)
                            .with_field("LIST", Field(arr.clone(), Some(arr.clone())))
                            .with_input("ITEM", item);
                        self.finish(id.clone(), block);
                        Some(id)
                    }
                    "pop" => {
                        let del_id = self.reserve();
                        let len_id = self.emit_child(&del_id, Opcode::DataLengthOfList, |b| {
                            b.with_field("LIST", Field(arr.clone(), Some(arr.clone())))
                        });
                        let block = Block::new(Opcode::DataDeleteOfList)
                            .with_field("LIST", Field(arr.clone(), Some(arr.clone())))
                            .with_input("INDEX", Input::BlockRef(Operand::Block(len_id)));
                        self.finish(del_id.clone(), block);
                        Some(del_id)
                    }
                    _ => None,
                }
            }
        }
    }

    fn lower_if(&mut self, test: &Expr, consequent: &Stmt) -> BlockId {
        let id = self.reserve();
        let condition = self.encode(test, &id);
        let entry = self.lower_stmt_list(Self::body_of(consequent), Some(id.clone()));
        let mut block = Block::new(Opcode::ControlIf).with_input("CONDITION", condition);
        if let Some(e) = entry {
            block = block.with_input("SUBSTACK", Input::BlockRef(Operand::Block(e)));
        }
        self.finish(id.clone(), block);
        id
    }

    fn lower_while(&mut self, test: &Expr, body: &Stmt) -> BlockId {
        let id = self.reserve();
        let condition = self.encode_negated(test, &id);
        let entry = self.lower_stmt_list(Self::body_of(body), Some(id.clone()));
        let mut block = Block::new(Opcode::ControlRepeatUntil).with_input("CONDITION", condition);
        if let Some(e) = entry {
            block = block.with_input("SUBSTACK", Input::BlockRef(Operand::Block(e)));
        }
        self.finish(id.clone(), block);
        id
    }

    fn lower_for(&mut self, init: Option<&Stmt>, test: Option<&Expr>, update: Option<&Expr>, body: &Stmt) -> BlockId {
        if let Some(simple) = self.try_simple_for(init, test, update, body) {
            return simple;
        }
        self.lower_general_for(init, test, update, body)
    }

    /// Recognizes `for (let i = start; i < end; i++)` (or `<=`, or `i += 1`)
    /// and lowers it via `control_repeat` (§4.5.1).
    fn try_simple_for(&mut self, init: Option<&Stmt>, test: Option<&Expr>, update: Option<&Expr>, body: &Stmt) -> Option<BlockId> {
        let Stmt::VarDecl {
            name: loop_var,
            init: Some(start),
            ..
        } = init?
        else {
            return None;
        };
        let Expr::Binary { op, left, right: end, .. } = test? else {
            return None;
        };
        if !matches!(op, BinOp::Lt | BinOp::Le) {
            return None;
        }
        let Expr::Identifier { name: test_var, .. } = left.as_ref() else {
            return None;
        };
        if test_var != loop_var {
            return None;
        }
        let Expr::Assign {
            target: upd_target,
            value: upd_value,
            ..
        } = update?
        else {
            return None;
        };
        let AssignTarget::Identifier(upd_name) = upd_target.as_ref() else {
            return None;
        };
        if upd_name != loop_var {
            return None;
        }
        let Expr::Binary {
            op: BinOp::Add,
            left: incr_left,
            right: incr_right,
            ..
        } = upd_value.as_ref()
        else {
            return None;
        };
        let is_increment_by_one = matches!(incr_left.as_ref(), Expr::Identifier { name, .. } if name == loop_var)
            && matches!(incr_right.as_ref(), Expr::NumberLiteral { value, .. } if (*value - 1.0).abs() < f64::EPSILON);
        if !is_increment_by_one {
            return None;
        }

        let init_id = self.reserve();
        let start_input = self.encode(start, &init_id);
        let init_block = Block::new(Opcode::DataSetVariableTo)
            .with_field("VARIABLE", Field(loop_var.clone(), Some(loop_var.clone())))
            .with_input("VALUE", start_input);
        self.finish(init_id.clone(), init_block);

        let repeat_id = self.reserve();
        let span = Span::SYNTHETIC;
        let count_expr = Expr::Binary {
            op: BinOp::Sub,
            left: Box::new(end.clone()),
            right: Box::new(start.clone()),
            span,
        };
        let count_expr = if matches!(op, BinOp::Le) {
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(count_expr),
                right: Box::new(Expr::NumberLiteral { value: 1.0, span }),
                span,
            }
        } else {
            count_expr
        };
        let times_input = self.encode(&count_expr, &repeat_id);

        let body_entry = self.lower_stmt_list(Self::body_of(body), Some(repeat_id.clone()));
        let incr_id = self
            .lower_assignment_stmt(
                &AssignTarget::Identifier(loop_var.clone()),
                &Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(Expr::Identifier {
                        name: loop_var.clone(),
                        span,
                    }),
                    right: Box::new(Expr::NumberLiteral { value: 1.0, span }),
                    span,
                },
            )
            .expect("identifier assignment always emits a block");
        let substack_entry = match &body_entry {
            Some(entry) => {
                let tail = self.chain_tail(entry.clone());
                self.blocks.get_mut(&tail).expect("just-created block").next = Some(incr_id.clone());
                self.blocks.get_mut(&incr_id).expect("just-created block").parent = Some(tail);
                entry.clone()
            }
            None => {
                self.blocks.get_mut(&incr_id).expect("just-created block").parent = Some(repeat_id.clone());
                incr_id.clone()
            }
        };

        let repeat_block = Block::new(Opcode::ControlRepeat)
            .with_input("TIMES", times_input)
            .with_input("SUBSTACK", Input::BlockRef(Operand::Block(substack_entry)));
        self.finish(repeat_id.clone(), repeat_block);

        self.blocks.get_mut(&init_id).expect("just-created block").next = Some(repeat_id.clone());
        self.blocks.get_mut(&repeat_id).expect("just-created block").parent = Some(init_id.clone());
        Some(init_id)
    }

    fn lower_general_for(&mut self, init: Option<&Stmt>, test: Option<&Expr>, update: Option<&Expr>, body: &Stmt) -> BlockId {
        let init_entry = init.and_then(|s| self.lower_stmt(s));

        let id = self.reserve();
        let condition = match test {
            Some(t) => self.encode_negated(t, &id),
            None => Input::LiteralShadow(ShadowPayload::Text(TextShadow("true".to_string()))),
        };
        let body_entry = self.lower_stmt_list(Self::body_of(body), Some(id.clone()));
        let update_entry = update.and_then(|u| self.lower_expr_stmt(u));

        let substack_entry = match (&body_entry, &update_entry) {
            (Some(b), Some(u)) => {
                let tail = self.chain_tail(b.clone());
                self.blocks.get_mut(&tail).expect("just-created block").next = Some(u.clone());
                self.blocks.get_mut(u).expect("just-created block").parent = Some(tail);
                Some(b.clone())
            }
            (Some(b), None) => Some(b.clone()),
            (None, Some(u)) => {
                self.blocks.get_mut(u).expect("just-created block").parent = Some(id.clone());
                Some(u.clone())
            }
            (None, None) => None,
        };

        let mut block = Block::new(Opcode::ControlRepeatUntil).with_input("CONDITION", condition);
        if let Some(e) = substack_entry {
            block = block.with_input("SUBSTACK", Input::BlockRef(Operand::Block(e)));
        }
        self.finish(id.clone(), block);

        if let Some(entry) = init_entry {
            let tail = self.chain_tail(entry.clone());
            self.blocks.get_mut(&tail).expect("just-created block").next = Some(id.clone());
            self.blocks.get_mut(&id).expect("just-created block").parent = Some(tail);
            entry
        } else {
            id
        }
    }

    fn lower_function_decl(&mut self, name: &str, params: &[String], body: &[Stmt]) {
        if !self.symbols.recursive_functions.contains(name) {
            return;
        }
        let id = self.reserve();
        let entry = self.lower_stmt_list(body, Some(id.clone()));
        let mut block = Block::new(Opcode::ProceduresDefinition).with_mutation(Mutation::procedure(name, params));
        block.top_level = true;
        block.next = entry.clone();
        self.finish(id.clone(), block);
        if let Some(e) = entry {
            self.blocks.get_mut(&e).expect("just-created block").parent = Some(id);
        }
    }

    /// The `encode` table (§4.5.2).
    fn encode(&mut self, expr: &Expr, owner: &BlockId) -> Input {
        match expr {
            Expr::NumberLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Number(NumShadow(crate::symbols::format_number(*value)))),
            Expr::StringLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Text(TextShadow(value.clone()))),
            Expr::BoolLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Text(TextShadow(value.to_string()))),
            Expr::Identifier { name, .. } => variable_reporter(name),
            Expr::Member { object, property, .. } => self.encode_member(object, property, owner),
            Expr::Call { callee, arguments, .. } => self.encode_call(callee, arguments, owner),
            Expr::Unary { op: UnaryOp::Not, argument, .. } => {
                let id = self.emit_child(owner, Opcode::OperatorNot, |b| b);
                let operand = self.encode(argument, &id);
                self.blocks
                    .get_mut(&id)
                    .expect("just-created block")
                    .inputs
                    .insert("OPERAND".to_string(), operand);
                Input::BlockRef(Operand::Block(id))
            }
            Expr::Binary { op, left, right, .. } => self.lower_binary_op(*op, left, right, owner),
            Expr::ArrayLiteral { .. }
            | Expr::ObjectLiteral { .. }
            | Expr::Assign { .. }
            | Expr::FunctionExpr { .. }
            | Expr::Await { .. }
            | Expr::Other { .. } => zero_text_fallback(),
        }
    }

    fn encode_member(&mut self, object: &Expr, property: &MemberKey, owner: &BlockId) -> Input {
        let Expr::Identifier { name: base, .. } = object else {
            return zero_text_fallback();
        };
        if self.symbols.lists.contains(base) {
            match property {
                MemberKey::Name(p) if p == "length" => {
                    let id = self.emit_child(owner, Opcode::DataLengthOfList, |b| b.with_field("LIST", Field(base.clone(), Some(base.clone()))));
                    Input::BlockRef(Operand::Block(id))
                }
                MemberKey::Computed(index) => {
                    let id = self.emit_child(owner, Opcode::DataItemOfList, |b| b.with_field("LIST", Field(base.clone(), Some(base.clone()))));
                    let index_input = self.encode(index, &id);
                    self.blocks
                        .get_mut(&id)
                        .expect("just-created block")
                        .inputs
                        .insert("INDEX".to_string(), index_input);
                    Input::BlockRef(Operand::Block(id))
                }
                _ => zero_text_fallback(),
            }
        } else if let Some(props) = self.symbols.object_mappings.get(base) {
            let Some(prop) = member_key_name(property) else {
                return zero_text_fallback();
            };
            if props.contains(&prop) {
                variable_reporter(&SymbolTable::flattened_name(base, &prop))
            } else {
                zero_text_fallback()
            }
        } else {
            zero_text_fallback()
        }
    }

    fn encode_call(&mut self, callee: &Callee, args: &[Expr], owner: &BlockId) -> Input {
        let Callee::Identifier(name) = callee else {
            return zero_text_fallback();
        };
        if self.symbols.recursive_functions.contains(name) {
            let Some(def) = self.symbols.function_definitions.get(name).cloned() else {
                return zero_text_fallback();
            };
            let id = self.reserve();
            let mut block = Block::new(Opcode::ProceduresCall).with_mutation(Mutation::procedure(name.clone(), &def.params));
            block.parent = Some(owner.clone());
            self.finish(id.clone(), block);
            for (i, param) in def.params.iter().enumerate() {
                let input = match args.get(i) {
                    Some(a) => self.encode(a, &id),
                    None => Input::LiteralShadow(ShadowPayload::Number(NumShadow("0".to_string()))),
                };
                self.blocks.get_mut(&id).expect("just-created block").inputs.insert(param.clone(), input);
            }
            self.extra_variables.insert(format!("{name}_result"));
            Input::BlockRef(Operand::Block(id))
        } else if let Some(def) = self.symbols.function_definitions.get(name).cloned() {
            let mut substitution: IndexMap<String, Expr> = IndexMap::new();
            for (i, param) in def.params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or(Expr::NumberLiteral {
                    value: 0.0,
                    span: Span::SYNTHETIC,
                });
                substitution.insert(param.clone(), value);
            }
            let chosen = match &def.body {
                FunctionBody::Expr(e) => Some((**e).clone()),
                FunctionBody::Block(stmts) => find_first_return(stmts),
            };
            match chosen {
                Some(expr) => {
                    let substituted = substitute(&expr, &substitution);
                    self.encode(&substituted, owner)
                }
                None => Input::LiteralShadow(ShadowPayload::Number(NumShadow("0".to_string()))),
            }
        } else {
            zero_text_fallback()
        }
    }

    /// For an arithmetic slot (`NUM1`/`NUM2`), identifiers use a number
    /// shadow (not the general identifier encoding's text shadow);
    /// everything else recurses through the normal table (§4.5.3).
    fn encode_arithmetic_operand(&mut self, expr: &Expr, owner: &BlockId) -> Input {
        match expr {
            Expr::Identifier { name, .. } => {
                Input::BlockRefWithShadow(Operand::Variable(VariableReporter(name.clone())), ShadowPayload::Number(NumShadow(String::new())))
            }
            _ => self.encode(expr, owner),
        }
    }

    /// For a comparison slot (`OPERAND1`/`OPERAND2`), literals always use a
    /// text shadow and identifiers drop the shadow entirely, except the left
    /// operand of `operator_gt`, which keeps a text shadow — reproduced
    /// exactly per §4.5.3 and §9 (the documented `operator_gt`/`operator_lt`
    /// asymmetry is intentional, not a bug to fix here).
    fn encode_comparison_operand(&mut self, expr: &Expr, owner: &BlockId, left_of_gt: bool) -> Input {
        match expr {
            Expr::NumberLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Text(TextShadow(crate::symbols::format_number(*value)))),
            Expr::StringLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Text(TextShadow(value.clone()))),
            Expr::BoolLiteral { value, .. } => Input::LiteralShadow(ShadowPayload::Text(TextShadow(value.to_string()))),
            Expr::Identifier { name, .. } if left_of_gt => {
                Input::BlockRefWithShadow(Operand::Variable(VariableReporter(name.clone())), ShadowPayload::Text(TextShadow(String::new())))
            }
            Expr::Identifier { name, .. } => Input::BlockRef(Operand::Variable(VariableReporter(name.clone()))),
            _ => self.encode(expr, owner),
        }
    }

    /// The comparison/arithmetic lowering table (§4.5.3), used both for a
    /// literal source `Binary` expression and for the dual-operator rewrite
    /// performed by [`Self::encode_negated`].
    fn lower_binary_op(&mut self, op: BinOp, left: &Expr, right: &Expr, owner: &BlockId) -> Input {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let opcode = match op {
                    BinOp::Add => Opcode::OperatorAdd,
                    BinOp::Sub => Opcode::OperatorSubtract,
                    BinOp::Mul => Opcode::OperatorMultiply,
                    _ => Opcode::OperatorDivide,
                };
                let id = self.reserve();
                let num1 = self.encode_arithmetic_operand(left, &id);
                let num2 = self.encode_arithmetic_operand(right, &id);
                let mut block = Block::new(opcode).with_input("NUM1", num1).with_input("NUM2", num2);
                block.parent = Some(owner.clone());
                self.finish(id.clone(), block);
                Input::BlockRef(Operand::Block(id))
            }
            BinOp::Lt | BinOp::Gt | BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Ge => {
                let (opcode, wrap) = match op {
                    BinOp::Lt => (Opcode::OperatorLt, false),
                    BinOp::Gt => (Opcode::OperatorGt, false),
                    BinOp::Eq => (Opcode::OperatorEquals, false),
                    BinOp::Ne => (Opcode::OperatorEquals, true),
                    BinOp::Le => (Opcode::OperatorGt, true),
                    BinOp::Ge => (Opcode::OperatorLt, true),
                    _ => unreachable!(),
                };
                let left_of_gt = matches!(opcode, Opcode::OperatorGt);
                let not_id = if wrap { Some(self.reserve()) } else { None };
                let op_id = self.reserve();
                let comparison_parent = not_id.clone().unwrap_or_else(|| owner.clone());
                let operand1 = self.encode_comparison_operand(left, &op_id, left_of_gt);
                let operand2 = self.encode_comparison_operand(right, &op_id, false);
                let mut block = Block::new(opcode).with_input("OPERAND1", operand1).with_input("OPERAND2", operand2);
                block.parent = Some(comparison_parent);
                self.finish(op_id.clone(), block);
                match not_id {
                    Some(not_id) => {
                        let mut not_block = Block::new(Opcode::OperatorNot).with_input("OPERAND", Input::BlockRef(Operand::Block(op_id)));
                        not_block.parent = Some(owner.clone());
                        self.finish(not_id.clone(), not_block);
                        Input::BlockRef(Operand::Block(not_id))
                    }
                    None => Input::BlockRef(Operand::Block(op_id)),
                }
            }
        }
    }

    /// `encode(¬test)`: comparisons rewrite to their dual operator (which
    /// already carries the right wrap per the table); anything else is
    /// wrapped whole in `operator_not` (§4.5.3).
    fn encode_negated(&mut self, test: &Expr, owner: &BlockId) -> Input {
        if let Expr::Binary { op, left, right, .. } = test {
            if let Some(dual) = dual_comparison(*op) {
                return self.lower_binary_op(dual, left, right, owner);
            }
        }
        let id = self.emit_child(owner, Opcode::OperatorNot, |b| b);
        let operand = self.encode(test, &id);
        self.blocks
            .get_mut(&id)
            .expect("just-created block")
            .inputs
            .insert("OPERAND".to_string(), operand);
        Input::BlockRef(Operand::Block(id))
    }
}

fn dual_comparison(op: BinOp) -> Option<BinOp> {
    match op {
        BinOp::Lt => Some(BinOp::Ge),
        BinOp::Gt => Some(BinOp::Le),
        BinOp::Eq => Some(BinOp::Ne),
        BinOp::Ne => Some(BinOp::Eq),
        BinOp::Le => Some(BinOp::Gt),
        BinOp::Ge => Some(BinOp::Lt),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => None,
    }
}

fn member_key_name(key: &MemberKey) -> Option<String> {
    match key {
        MemberKey::Name(name) => Some(name.clone()),
        MemberKey::Computed(expr) => match expr.as_ref() {
            Expr::StringLiteral { value, .. } => Some(value.clone()),
            _ => None,
        },
    }
}

fn variable_reporter(name: &str) -> Input {
    Input::BlockRefWithShadow(Operand::Variable(VariableReporter(name.to_string())), ShadowPayload::Text(TextShadow(String::new())))
}

fn zero_text_fallback() -> Input {
    Input::LiteralShadow(ShadowPayload::Text(TextShadow("0".to_string())))
}

/// Pre-order search for the first `return <expr>;`, descending into
/// `if`/`while`/`for`/block bodies but never into nested function
/// declarations (§4.5.2: "pick the first return-statement's argument").
fn find_first_return(stmts: &[Stmt]) -> Option<Expr> {
    stmts.iter().find_map(find_first_return_in_stmt)
}

fn find_first_return_in_stmt(stmt: &Stmt) -> Option<Expr> {
    match stmt {
        Stmt::Return { argument: Some(e), .. } => Some(e.clone()),
        Stmt::If { consequent, .. } => find_first_return_in_stmt(consequent),
        Stmt::While { body, .. } => find_first_return_in_stmt(body),
        Stmt::For { body, .. } => find_first_return_in_stmt(body),
        Stmt::Block { body, .. } => find_first_return(body),
        _ => None,
    }
}

/// Simultaneous, single-pass substitution of each parameter name with its
/// argument expression. Because every parameter is replaced in one pass
/// against the original tree (never re-entering an already-substituted
/// subexpression), this is capture-free by construction: a substituted
/// argument can never be re-captured by a still-pending parameter
/// replacement (§9).
fn substitute(expr: &Expr, map: &IndexMap<String, Expr>) -> Expr {
    match expr {
        Expr::Identifier { name, .. } => map.get(name).cloned().unwrap_or_else(|| expr.clone()),
        Expr::NumberLiteral { .. } | Expr::StringLiteral { .. } | Expr::BoolLiteral { .. } | Expr::Other { .. } => expr.clone(),
        Expr::ArrayLiteral { elements, span } => Expr::ArrayLiteral {
            elements: elements.iter().map(|e| substitute(e, map)).collect(),
            span: *span,
        },
        Expr::ObjectLiteral { properties, span } => Expr::ObjectLiteral {
            properties: properties.iter().map(|(k, v)| (k.clone(), substitute(v, map))).collect(),
            span: *span,
        },
        Expr::Assign { target, value, span } => Expr::Assign {
            target: Box::new(substitute_target(target, map)),
            value: Box::new(substitute(value, map)),
            span: *span,
        },
        Expr::Binary { op, left, right, span } => Expr::Binary {
            op: *op,
            left: Box::new(substitute(left, map)),
            right: Box::new(substitute(right, map)),
            span: *span,
        },
        Expr::Unary { op, argument, span } => Expr::Unary {
            op: *op,
            argument: Box::new(substitute(argument, map)),
            span: *span,
        },
        Expr::Call { callee, arguments, span } => Expr::Call {
            callee: Box::new(substitute_callee(callee, map)),
            arguments: arguments.iter().map(|a| substitute(a, map)).collect(),
            span: *span,
        },
        Expr::Member { object, property, span } => Expr::Member {
            object: Box::new(substitute(object, map)),
            property: substitute_key(property, map),
            span: *span,
        },
        Expr::FunctionExpr {
            params,
            body,
            is_async,
            span,
        } => {
            // A parameter of the nested function shadows the outer
            // substitution for its own name — capture-free by exclusion.
            let mut inner = map.clone();
            for p in params {
                inner.shift_remove(p);
            }
            Expr::FunctionExpr {
                params: params.clone(),
                body: substitute_body(body, &inner),
                is_async: *is_async,
                span: *span,
            }
        }
        Expr::Await { argument, span } => Expr::Await {
            argument: Box::new(substitute(argument, map)),
            span: *span,
        },
    }
}

fn substitute_target(target: &AssignTarget, map: &IndexMap<String, Expr>) -> AssignTarget {
    match target {
        AssignTarget::Identifier(name) => AssignTarget::Identifier(name.clone()),
        AssignTarget::Member { object, property } => AssignTarget::Member {
            object: substitute(object, map),
            property: substitute_key(property, map),
        },
    }
}

fn substitute_key(key: &MemberKey, map: &IndexMap<String, Expr>) -> MemberKey {
    match key {
        MemberKey::Name(name) => MemberKey::Name(name.clone()),
        MemberKey::Computed(expr) => MemberKey::Computed(Box::new(substitute(expr, map))),
    }
}

fn substitute_body(body: &FunctionBody, map: &IndexMap<String, Expr>) -> FunctionBody {
    match body {
        FunctionBody::Expr(e) => FunctionBody::Expr(Box::new(substitute(e, map))),
        FunctionBody::Block(stmts) => FunctionBody::Block(stmts.iter().map(|s| substitute_stmt(s, map)).collect()),
    }
}

fn substitute_stmt(stmt: &Stmt, map: &IndexMap<String, Expr>) -> Stmt {
    match stmt {
        Stmt::VarDecl { name, init, span } => Stmt::VarDecl {
            name: name.clone(),
            init: init.as_ref().map(|e| substitute(e, map)),
            span: *span,
        },
        Stmt::Expr { expr, span } => Stmt::Expr {
            expr: substitute(expr, map),
            span: *span,
        },
        Stmt::If { test, consequent, span } => Stmt::If {
            test: substitute(test, map),
            consequent: Box::new(substitute_stmt(consequent, map)),
            span: *span,
        },
        Stmt::While { test, body, span } => Stmt::While {
            test: substitute(test, map),
            body: Box::new(substitute_stmt(body, map)),
            span: *span,
        },
        Stmt::For {
            init,
            test,
            update,
            body,
            span,
        } => Stmt::For {
            init: init.as_ref().map(|s| Box::new(substitute_stmt(s, map))),
            test: test.as_ref().map(|e| substitute(e, map)),
            update: update.as_ref().map(|e| substitute(e, map)),
            body: Box::new(substitute_stmt(body, map)),
            span: *span,
        },
        Stmt::Block { body, span } => Stmt::Block {
            body: body.iter().map(|s| substitute_stmt(s, map)).collect(),
            span: *span,
        },
        Stmt::FunctionDecl {
            name,
            params,
            body,
            is_async,
            span,
        } => {
            let mut inner = map.clone();
            for p in params {
                inner.shift_remove(p);
            }
            Stmt::FunctionDecl {
                name: name.clone(),
                params: params.clone(),
                body: body.iter().map(|s| substitute_stmt(s, &inner)).collect(),
                is_async: *is_async,
                span: *span,
            }
        }
        Stmt::Return { argument, span } => Stmt::Return {
            argument: argument.as_ref().map(|e| substitute(e, map)),
            span: *span,
        },
        Stmt::Other { span } => Stmt::Other { span: *span },
    }
}

fn substitute_callee(callee: &Callee, map: &IndexMap<String, Expr>) -> Callee {
    match callee {
        Callee::Identifier(name) => Callee::Identifier(name.clone()),
        Callee::Member { object, property } => Callee::Member {
            object: substitute(object, map),
            property: property.clone(),
        },
    }
}
