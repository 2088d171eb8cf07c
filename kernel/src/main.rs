    #![no_std]
    #![no_main]
    #![feature(alloc_error_handler)]
    #![feature(abi_x86_interrupt)]

    extern crate alloc;

    mod arch;
    mod console;
    mod crypto;
    mod drivers;
    // `fs`, `security`, `sched`, `process`, `signal`, `syscall`, `net`, `ipc`,
    // and `task` stay in the module tree purely because
    // `arch::x86_64_arch::syscall` resolves symbols in them at compile time
    // for the INT 0x80 dispatch table — none of them are initialized or
    // reachable from `kernel_main` below, since this kernel never creates a
    // user process to trigger that path. See DESIGN.md's boot-path section.
    mod fs;
    mod ipc;
    mod mm;
    mod net;
    mod process;
    mod security;
    mod serial;
    mod sched;
    mod signal;
    mod storage;
    mod sync;
    mod syscall;
    mod task;
    mod time;
    mod util;

    use bootloader_api::config::{BootloaderConfig, FrameBuffer, Mapping};
    use bootloader_api::{entry_point, BootInfo};

    pub static BOOTLOADER_CONFIG: BootloaderConfig = {
        let mut config = BootloaderConfig::new_default();
        // Precisamos do mapeamento de memória física para:
        // - ler page tables ativas via CR3
        // - mapear MMIO no futuro (PCI BARs, APIC, etc.)
        config.mappings.physical_memory = Some(Mapping::Dynamic);
        // Stack do kernel relativamente grande (ISR + stacks por thread ficam separados).
        config.kernel_stack_size = 256 * 1024;
        // Request a framebuffer for GOP/UEFI graphics
        let mut fb = FrameBuffer::new_default();
        fb.minimum_framebuffer_width = Some(800);
        fb.minimum_framebuffer_height = Some(600);
        config.frame_buffer = fb;
        config
    };

    entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

    fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
        serial::init();
        util::banner();

        util::kprintln!("boot: inicializando arch/x86_64...");
        arch::init();

        util::kprintln!("boot: inicializando memória...");
        mm::init(boot_info);
        mm::vma::init();

        // ACPI deve ser inicializado antes do APIC para que o MADT seja usado
        util::kprintln!("boot: detectando ACPI...");
        drivers::acpi::init();

        // Tenta migrar para APIC (requer mm inicializado + ACPI para MADT)
        arch::init_late();

        // Inicializa HPET para timing de alta precisão
        util::kprintln!("boot: inicializando HPET...");
        if drivers::hpet::init() {
            util::kprintln!("boot: HPET disponível");
        } else {
            util::kprintln!("boot: HPET não disponível, usando timers alternativos");
        }

        // Inicializa TSC (Time Stamp Counter)
        util::kprintln!("boot: inicializando TSC...");
        if arch::tsc::init() {
            util::kprintln!("boot: TSC disponível");
        } else {
            util::kprintln!("boot: TSC não disponível");
        }

        util::kprintln!("boot: inicializando input (teclado/mouse)...");
        drivers::input::init();
        drivers::mouse::init();

        util::kprintln!("boot: inicializando storage (PCI scan + virtio-blk/AHCI/NVMe/IDE)...");
        storage::init();

        util::kprintln!("boot: inicializando USB (EHCI/UHCI/xHCI/OHCI)...");
        drivers::usb::init();

        util::kprintln!("boot: habilitando interrupções...");
        arch::enable_interrupts();

        util::kprintln!("boot: USB host subsystem pronto.\n");
        loop {
            x86_64::instructions::hlt();
        }
    }

    use core::panic::PanicInfo;

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        util::kprintln!("\n\n!!! KERNEL PANIC !!!");
        util::kprintln!("mensagem: {}", info.message());
        if let Some(loc) = info.location() {
            util::kprintln!("local: {}:{}:{}", loc.file(), loc.line(), loc.column());
        }
        util::kprintln!("halt.");
        arch::halt_loop();
    }

    #[alloc_error_handler]
    fn alloc_error(layout: core::alloc::Layout) -> ! {
        util::kprintln!("ERRO: alocação falhou: {:?}", layout);
        arch::halt_loop();
    }
