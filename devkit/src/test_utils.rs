/*!
Faux arbre noyau pour les tests

Crée un répertoire temporaire avec `proc/` et `sys/` et des helpers pour
écrire `stat`, `meminfo`, `net/dev`, `uptime`, `cpuinfo`, les processus et
les capteurs de température au format réel du noyau.
*/

use anyhow::{Context, Result};
use hostdeck_agent::{KernelPaths, TelemetryConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Processus simulé dans `proc/<pid>/`
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: u32,
    pub comm: String,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
    pub resident_pages: u64,
}

impl FakeProcess {
    pub fn new(pid: u32, comm: &str) -> Self {
        Self {
            pid,
            comm: comm.to_string(),
            utime: 0,
            stime: 0,
            starttime: 0,
            resident_pages: 0,
        }
    }

    pub fn cpu_ticks(mut self, utime: u64, stime: u64) -> Self {
        self.utime = utime;
        self.stime = stime;
        self
    }

    pub fn started_at(mut self, starttime: u64) -> Self {
        self.starttime = starttime;
        self
    }

    pub fn resident(mut self, pages: u64) -> Self {
        self.resident_pages = pages;
        self
    }

    fn stat_line(&self) -> String {
        format!(
            "{} ({}) S 1 {} {} 0 -1 4194560 100 0 0 0 {} {} 0 0 20 0 1 0 {} 1000000 {} 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0\n",
            self.pid, self.comm, self.pid, self.pid, self.utime, self.stime, self.starttime, self.resident_pages
        )
    }
}

/// Arbre `proc`/`sys` jetable
pub struct FakeKernelTree {
    dir: TempDir,
}

impl FakeKernelTree {
    pub fn new() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        std::fs::create_dir_all(dir.path().join("proc/net"))?;
        std::fs::create_dir_all(dir.path().join("sys"))?;
        Ok(Self { dir })
    }

    pub fn proc_root(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    pub fn sys_root(&self) -> PathBuf {
        self.dir.path().join("sys")
    }

    pub fn paths(&self) -> KernelPaths {
        KernelPaths::new(self.proc_root(), self.sys_root())
    }

    /// Config télémétrie pointant sur cet arbre (page de 4096 octets)
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            proc_root: Some(self.proc_root()),
            sys_root: Some(self.sys_root()),
            page_size: Some(4096),
            ..Default::default()
        }
    }

    pub fn write_proc(&self, rel: &str, content: &str) -> Result<&Self> {
        write_file(&self.proc_root().join(rel), content)?;
        Ok(self)
    }

    pub fn write_sys(&self, rel: &str, content: &str) -> Result<&Self> {
        write_file(&self.sys_root().join(rel), content)?;
        Ok(self)
    }

    /// Ligne `cpu` agrégée: idle = `idle` et total = `total` (le reste en user)
    pub fn write_cpu_ticks(&self, idle: u64, total: u64) -> Result<&Self> {
        let user = total.saturating_sub(idle);
        self.write_proc(
            "stat",
            &format!("cpu  {user} 0 0 {idle} 0 0 0 0 0 0\ncpu0 {user} 0 0 {idle} 0 0 0 0 0 0\nintr 0\nctxt 0\n"),
        )
    }

    pub fn write_meminfo(&self, total_kb: u64, available_kb: Option<u64>, free_kb: u64) -> Result<&Self> {
        let mut content = format!("MemTotal:       {total_kb} kB\nMemFree:        {free_kb} kB\n");
        if let Some(available) = available_kb {
            content.push_str(&format!("MemAvailable:   {available} kB\n"));
        }
        content.push_str("Buffers:          1024 kB\nCached:           2048 kB\n");
        self.write_proc("meminfo", &content)
    }

    /// `(interface, rx_bytes, tx_bytes)`; `lo` est ajouté automatiquement
    pub fn write_net_dev(&self, interfaces: &[(&str, u64, u64)]) -> Result<&Self> {
        let mut content = String::from(
            "Inter-|   Receive                                                |  Transmit\n \
             face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
        );
        content.push_str("    lo: 424242 100 0 0 0 0 0 0 424242 100 0 0 0 0 0 0\n");
        for (name, rx, tx) in interfaces {
            content.push_str(&format!(
                "{name:>6}: {rx} 10 0 0 0 0 0 0 {tx} 20 0 0 0 0 0 0\n"
            ));
        }
        self.write_proc("net/dev", &content)
    }

    pub fn write_uptime(&self, secs: f64) -> Result<&Self> {
        self.write_proc("uptime", &format!("{secs:.2} {:.2}\n", secs * 2.0))
    }

    pub fn write_cpuinfo(&self, cores: usize) -> Result<&Self> {
        let content: String = (0..cores)
            .map(|i| format!("processor\t: {i}\nmodel name\t: Fake CPU\n\n"))
            .collect();
        self.write_proc("cpuinfo", &content)
    }

    pub fn add_process(&self, process: &FakeProcess) -> Result<&Self> {
        let dir = format!("{}", process.pid);
        self.write_proc(&format!("{dir}/stat"), &process.stat_line())?;
        self.write_proc(
            &format!("{dir}/statm"),
            &format!("{} {} 100 10 0 50 0\n", process.resident_pages * 2, process.resident_pages),
        )
    }

    /// Simule un processus qui disparaît en cours de scan (stat sans statm)
    pub fn add_vanishing_process(&self, process: &FakeProcess) -> Result<&Self> {
        self.write_proc(&format!("{}/stat", process.pid), &process.stat_line())
    }

    pub fn write_temperature(&self, rel: &str, millidegrees: i64) -> Result<&Self> {
        self.write_sys(rel, &format!("{millidegrees}\n"))
    }

    /// Arbre complet et cohérent pour les tests de bout en bout
    pub fn populated() -> Result<Self> {
        let tree = Self::new()?;
        tree.write_cpu_ticks(100, 200)?
            .write_meminfo(8_000_000, Some(6_000_000), 1_000_000)?
            .write_net_dev(&[("eth0", 1000, 500)])?
            .write_uptime(1000.0)?
            .write_cpuinfo(1)?
            .write_temperature("class/thermal/thermal_zone0/temp", 42_000)?;
        Ok(tree)
    }
}

/// Écrit via un fichier temporaire + rename: un lecteur concurrent voit
/// l'ancien contenu ou le nouveau, jamais un fichier tronqué
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("partial");
    std::fs::write(&staging, content).with_context(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, path).with_context(|| format!("Failed to replace {}", path.display()))
}
