//! Engine-compatibility validation for decoded [`Ncs`] scripts, grounded in
//! reverse-engineering notes on `CVirtualMachine::ExecuteCode`: a stack-based
//! interpreter that the retail engine is unforgiving about feeding malformed
//! bytecode to. A pure read-only pass over the decoded instruction list;
//! never repairs or re-encodes.

use kotor_common::error::Error;

use super::instr::{Opcode, Operand};
use super::Ncs;

const MAX_INSTRUCTIONS: usize = 10_000;
const MAX_STACK_DEPTH: i64 = 1_000;
const MAX_JUMP_DISTANCE: i64 = 1_000;
const MAX_CONSECUTIVE_NOPS: usize = 10;

pub fn validate(ncs: &Ncs) -> Result<(), Error> {
    let mut issues = Vec::new();

    if ncs.instructions.is_empty() {
        return Ok(());
    }

    validate_sequence(ncs, &mut issues);
    validate_stack(ncs, &mut issues);
    validate_control_flow(ncs, &mut issues);
    validate_execution_safety(ncs, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationError(issues.join("; ")))
    }
}

fn validate_sequence(ncs: &Ncs, issues: &mut Vec<String>) {
    let instructions = &ncs.instructions;
    for (i, instr) in instructions.iter().enumerate() {
        if instr.opcode == Opcode::Retn && i < instructions.len() - 1 {
            issues.push(format!("RETN instruction at position {i} is not at end of script"));
        }

        if i > 0 {
            let prev = &instructions[i - 1];
            if instr.opcode.is_stack_frame_op()
                && prev.opcode.is_stack_frame_op()
                && stack_ops_conflict(prev, instr)
            {
                issues.push(format!("conflicting stack operations at positions {} and {i}", i - 1));
            }
        }
    }
}

fn validate_stack(ncs: &Ncs, issues: &mut Vec<String>) {
    let mut depth: i64 = 0;
    let mut max_depth: i64 = 0;

    for (i, instr) in ncs.instructions.iter().enumerate() {
        match instr.opcode {
            Opcode::CpDownSp | Opcode::CpTopSp => {
                if let Operand::StackCopy { size, .. } = &instr.operand {
                    depth += element_count(*size);
                }
            }
            Opcode::Const => depth += 1,
            Opcode::Action => {
                if let Operand::Action { arg_count, .. } = &instr.operand {
                    depth -= *arg_count as i64;
                    depth += 1;
                }
            }
            _ => {}
        }

        max_depth = max_depth.max(depth);

        if depth < 0 {
            issues.push(format!("potential stack underflow at instruction {i}"));
            depth = 0;
        }
    }

    if max_depth > MAX_STACK_DEPTH {
        issues.push(format!("excessive stack usage (max depth {max_depth})"));
    }
}

fn validate_control_flow(ncs: &Ncs, issues: &mut Vec<String>) {
    for (i, instr) in ncs.instructions.iter().enumerate() {
        if !instr.opcode.is_jump() {
            continue;
        }
        let Operand::Jump(relative) = instr.operand else {
            issues.push(format!("jump instruction at position {i} has no operand"));
            continue;
        };
        let target = instr.address as i64 + relative as i64;
        let Some(target_index) = ncs.instructions.iter().position(|other| other.address as i64 == target) else {
            issues.push(format!("jump instruction at position {i} targets address {target}, not an instruction boundary"));
            continue;
        };

        if (target_index as i64 - i as i64).abs() > MAX_JUMP_DISTANCE {
            issues.push(format!(
                "unusually long jump at position {i} (distance {})",
                (target_index as i64 - i as i64).abs()
            ));
        }

        if instr.opcode == Opcode::Jsr && target_index == 0 {
            issues.push(format!("JSR at position {i} jumps to script start (potential recursion issue)"));
        }
    }
}

fn validate_execution_safety(ncs: &Ncs, issues: &mut Vec<String>) {
    if ncs.instructions.len() > MAX_INSTRUCTIONS {
        issues.push(format!("script is unusually long ({} instructions)", ncs.instructions.len()));
    }

    let mut consecutive_nops = 0usize;
    for instr in &ncs.instructions {
        if instr.opcode == Opcode::Nop {
            consecutive_nops += 1;
            if consecutive_nops > MAX_CONSECUTIVE_NOPS {
                issues.push("excessive consecutive NOP instructions detected".to_string());
                break;
            }
        } else {
            consecutive_nops = 0;
        }
    }
}

fn element_count(size_bytes: u16) -> i64 {
    // Every value on the Aurora VM stack is a 4-byte slot regardless of
    // its logical type; vectors/structs occupy `size / 4` consecutive slots.
    (size_bytes as i64 / 4).max(1)
}

fn stack_ops_conflict(prev: &super::Instruction, instr: &super::Instruction) -> bool {
    if prev.opcode == Opcode::CpDownSp && instr.opcode == Opcode::CpTopSp {
        if let (Operand::StackCopy { size: size1, .. }, Operand::StackCopy { size: size2, .. }) = (&prev.operand, &instr.operand) {
            return size1 != size2 && *size1 != 0 && *size2 != 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::{Instruction, TypeCode};

    fn instr(address: u32, opcode: Opcode, operand: Operand) -> Instruction {
        Instruction { address, opcode, type_code: TypeCode::Void, operand }
    }

    #[test]
    fn test_empty_script_is_valid() {
        assert!(validate(&Ncs::new()).is_ok());
    }

    #[test]
    fn test_well_formed_jump_passes() {
        let ncs = Ncs {
            instructions: vec![
                instr(0, Opcode::Jmp, Operand::Jump(5)),
                instr(5, Opcode::Retn, Operand::None),
            ],
        };
        assert!(validate(&ncs).is_ok());
    }

    #[test]
    fn test_jump_to_non_instruction_boundary_is_flagged() {
        let ncs = Ncs {
            instructions: vec![
                instr(0, Opcode::Jmp, Operand::Jump(3)),
                instr(5, Opcode::Retn, Operand::None),
            ],
        };
        let result = validate(&ncs);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_retn_not_at_end_is_flagged() {
        let ncs = Ncs {
            instructions: vec![
                instr(0, Opcode::Retn, Operand::None),
                instr(2, Opcode::Nop, Operand::None),
            ],
        };
        let result = validate(&ncs);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_jsr_to_script_start_is_flagged() {
        let ncs = Ncs {
            instructions: vec![
                instr(0, Opcode::Nop, Operand::None),
                instr(2, Opcode::Jsr, Operand::Jump(-2)),
            ],
        };
        let result = validate(&ncs);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_excessive_consecutive_nops_are_flagged() {
        let mut instructions: Vec<Instruction> = (0..12).map(|i| instr(i * 2, Opcode::Nop, Operand::None)).collect();
        instructions.push(instr(24, Opcode::Retn, Operand::None));
        let ncs = Ncs { instructions };
        let result = validate(&ncs);
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }
}
