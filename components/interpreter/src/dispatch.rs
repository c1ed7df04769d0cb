//! Opcode dispatch table.
//!
//! Maps every opcode byte to its handler. Bytes with no handler (the
//! reserved `breakpoint`/`impdep*` opcodes and unassigned bytes) are
//! host-fatal.

use crate::instructions::{
    comparisons, constants, control, conversions, extended, loads, math, references, stack, stores,
};
use crate::invoke;
use crate::thread::Thread;
use bytecode_system::Opcode;
use core_types::VmError;
use std::fmt;
use std::ops::RangeInclusive;

/// Opcode handler.
///
/// `Ok` covers both normal completion and a raised guest exception; `Err` is
/// a host fault.
pub type Handler = fn(&mut Thread) -> Result<(), VmError>;

fn unimplemented(t: &mut Thread) -> Result<(), VmError> {
    Err(VmError::UnimplementedOpcode {
        opcode: t.opcode()?,
        pc: t.pc()?,
    })
}

/// Handler per opcode byte.
///
/// # Examples
///
/// ```
/// use bytecode_system::Opcode;
/// use interpreter::DispatchTable;
///
/// let table = DispatchTable::new();
/// assert!(table.is_implemented(Opcode::Iadd.byte()));
/// assert!(table.is_implemented(Opcode::JsrW.byte()));
/// assert!(!table.is_implemented(Opcode::Breakpoint.byte()));
/// ```
#[derive(Clone)]
pub struct DispatchTable {
    handlers: [Handler; 256],
    implemented: [bool; 256],
}

impl DispatchTable {
    /// Table with a handler for every instruction from `nop` to `jsr_w`
    pub fn new() -> Self {
        let mut table = Self {
            handlers: [unimplemented as Handler; 256],
            implemented: [false; 256],
        };
        table.install();
        table
    }

    /// Handler for an opcode byte
    pub fn handler(&self, opcode: u8) -> Handler {
        self.handlers[usize::from(opcode)]
    }

    /// Replace the handler for `opcode`
    pub fn set(&mut self, opcode: Opcode, handler: Handler) {
        let index = usize::from(opcode.byte());
        self.handlers[index] = handler;
        self.implemented[index] = true;
    }

    /// Check if the byte has a real handler
    pub fn is_implemented(&self, opcode: u8) -> bool {
        self.implemented[usize::from(opcode)]
    }

    fn set_range(&mut self, range: RangeInclusive<Opcode>, handler: Handler) {
        for byte in range.start().byte()..=range.end().byte() {
            self.handlers[usize::from(byte)] = handler;
            self.implemented[usize::from(byte)] = true;
        }
    }

    fn install(&mut self) {
        use Opcode::*;

        // Constants
        self.set(Nop, constants::nop);
        self.set(AconstNull, constants::aconst_null);
        self.set_range(IconstM1..=Iconst5, constants::iconst);
        self.set_range(Lconst0..=Lconst1, constants::lconst);
        self.set_range(Fconst0..=Fconst2, constants::fconst);
        self.set_range(Dconst0..=Dconst1, constants::dconst);
        self.set(Bipush, constants::bipush);
        self.set(Sipush, constants::sipush);
        self.set(Ldc, constants::ldc);
        self.set(LdcW, constants::ldc_w);
        self.set(Ldc2W, constants::ldc_w);

        // Loads and stores
        self.set_range(Iload..=Aload, loads::load_indexed);
        self.set_range(Iload0..=Aload3, loads::load_n);
        self.set_range(Iaload..=Saload, loads::array_load);
        self.set_range(Istore..=Astore, stores::store_indexed);
        self.set_range(Istore0..=Astore3, stores::store_n);
        self.set_range(Iastore..=Sastore, stores::array_store);
        self.set(Aastore, stores::aastore);

        // Stack
        self.set(Pop, stack::pop);
        self.set(Pop2, stack::pop2);
        self.set(Dup, stack::dup);
        self.set(DupX1, stack::dup_x1);
        self.set(DupX2, stack::dup_x2);
        self.set(Dup2, stack::dup2);
        self.set(Dup2X1, stack::dup2_x1);
        self.set(Dup2X2, stack::dup2_x2);
        self.set(Swap, stack::swap);

        // Math
        self.set(Iadd, math::iadd);
        self.set(Ladd, math::ladd);
        self.set(Fadd, math::fadd);
        self.set(Dadd, math::dadd);
        self.set(Isub, math::isub);
        self.set(Lsub, math::lsub);
        self.set(Fsub, math::fsub);
        self.set(Dsub, math::dsub);
        self.set(Imul, math::imul);
        self.set(Lmul, math::lmul);
        self.set(Fmul, math::fmul);
        self.set(Dmul, math::dmul);
        self.set(Idiv, math::idiv);
        self.set(Ldiv, math::ldiv);
        self.set(Fdiv, math::fdiv);
        self.set(Ddiv, math::ddiv);
        self.set(Irem, math::irem);
        self.set(Lrem, math::lrem);
        self.set(Frem, math::frem);
        self.set(Drem, math::drem);
        self.set(Ineg, math::ineg);
        self.set(Lneg, math::lneg);
        self.set(Fneg, math::fneg);
        self.set(Dneg, math::dneg);
        self.set(Ishl, math::ishl);
        self.set(Lshl, math::lshl);
        self.set(Ishr, math::ishr);
        self.set(Lshr, math::lshr);
        self.set(Iushr, math::iushr);
        self.set(Lushr, math::lushr);
        self.set(Iand, math::iand);
        self.set(Land, math::land);
        self.set(Ior, math::ior);
        self.set(Lor, math::lor);
        self.set(Ixor, math::ixor);
        self.set(Lxor, math::lxor);
        self.set(Iinc, math::iinc);

        // Conversions
        self.set(I2l, conversions::i2l);
        self.set(I2f, conversions::i2f);
        self.set(I2d, conversions::i2d);
        self.set(L2i, conversions::l2i);
        self.set(L2f, conversions::l2f);
        self.set(L2d, conversions::l2d);
        self.set(F2i, conversions::f2i);
        self.set(F2l, conversions::f2l);
        self.set(F2d, conversions::f2d);
        self.set(D2i, conversions::d2i);
        self.set(D2l, conversions::d2l);
        self.set(D2f, conversions::d2f);
        self.set(I2b, conversions::i2b);
        self.set(I2c, conversions::i2c);
        self.set(I2s, conversions::i2s);

        // Comparisons
        self.set(Lcmp, comparisons::lcmp);
        self.set_range(Fcmpl..=Fcmpg, comparisons::fcmp_op);
        self.set_range(Dcmpl..=Dcmpg, comparisons::dcmp_op);
        self.set_range(Ifeq..=Ifle, comparisons::if_zero);
        self.set_range(IfIcmpeq..=IfIcmple, comparisons::if_icmp);
        self.set_range(IfAcmpeq..=IfAcmpne, comparisons::if_acmp);
        self.set_range(Ifnull..=Ifnonnull, comparisons::if_null);

        // Control
        self.set(Goto, control::goto);
        self.set(Jsr, control::jsr);
        self.set(Ret, control::ret);
        self.set(Tableswitch, control::tableswitch);
        self.set(Lookupswitch, control::lookupswitch);
        self.set_range(Ireturn..=Areturn, control::value_return);
        self.set(Return, control::void_return);
        self.set(Athrow, control::athrow);

        // References
        self.set(Getstatic, references::getstatic);
        self.set(Putstatic, references::putstatic);
        self.set(Getfield, references::getfield);
        self.set(Putfield, references::putfield);
        self.set(Invokevirtual, invoke::invokevirtual);
        self.set(Invokespecial, invoke::invokespecial);
        self.set(Invokestatic, invoke::invokestatic);
        self.set(Invokeinterface, invoke::invokeinterface);
        self.set(Invokedynamic, invoke::invokedynamic);
        self.set(New, references::new);
        self.set(Newarray, references::newarray);
        self.set(Anewarray, references::anewarray);
        self.set(Arraylength, references::arraylength);
        self.set(Checkcast, references::checkcast);
        self.set(Instanceof, references::instanceof);
        self.set(Monitorenter, references::monitorenter);
        self.set(Monitorexit, references::monitorexit);

        // Extended
        self.set(Wide, extended::wide);
        self.set(Multianewarray, extended::multianewarray);
        self.set(GotoW, extended::goto_w);
        self.set(JsrW, extended::jsr_w);
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("implemented", &self.implemented.iter().filter(|i| **i).count())
            .finish()
    }
}
